use googol_client::pager::spawn_auxiliary_lookups;
use googol_client::{ClientResult, GoogolClient, PageOutcome, SearchPager};
use shared::response::{BulkIndexOutcome, Story};

use crate::render::format_page;

pub fn stories_summary(stories: &ClientResult<Vec<Story>>) -> String {
    match stories {
        Ok(stories) if stories.is_empty() => "No matching Hacker News stories found.".into(),
        Ok(stories) => format!(
            "Found {} Hacker News stories matching your search.",
            stories.len()
        ),
        Err(err) => {
            log::warn!("Unable to fetch Hacker News stories: {}", err);
            "No matching Hacker News stories found.".into()
        }
    }
}

pub fn analysis_text(analysis: ClientResult<String>) -> String {
    match analysis {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => "Couldn't fetch analysis".into(),
        Err(err) => {
            log::warn!("Unable to fetch analysis: {}", err);
            "Couldn't fetch analysis".into()
        }
    }
}

/// Analysis and stories only accompany a fresh page of results.
pub fn should_fetch_extras(outcome: &PageOutcome) -> bool {
    matches!(outcome, PageOutcome::Page { fresh: true, .. })
}

/// Prints the analysis and story count for `query` once both lookups return.
/// Failures only affect their own line.
pub async fn print_extras(api: &GoogolClient, query: &str) {
    let lookups = spawn_auxiliary_lookups(api, query);

    match lookups.analysis.await {
        Ok(analysis) => println!("\n{}", analysis_text(analysis)),
        Err(err) => log::error!("analysis task failed: {}", err),
    }

    match lookups.stories.await {
        Ok(stories) => println!("{}", stories_summary(&stories)),
        Err(err) => log::error!("stories task failed: {}", err),
    }
}

pub async fn run_once(
    api: &GoogolClient,
    query: &str,
    page_size: u32,
    extras: bool,
) -> anyhow::Result<()> {
    let mut pager = SearchPager::new(page_size);
    let Some(request) = pager.submit(query) else {
        println!("Nothing to search for");
        return Ok(());
    };

    let outcome = pager.fetch(api, &request).await;
    let extras = extras && should_fetch_extras(&outcome);

    match outcome {
        PageOutcome::Page { page, .. } => print!("{}", format_page(&page, pager.page())),
        PageOutcome::Empty => println!("No results found!"),
        PageOutcome::Failed(err) => println!("{}", err.user_message()),
        PageOutcome::Stale => {}
    }

    if extras {
        print_extras(api, query).await;
    }

    Ok(())
}

pub async fn print_fathers(api: &GoogolClient, url: &str) {
    match api.fathers(url).await {
        Ok(fathers) if fathers.is_empty() => println!("No fathers found!"),
        Ok(fathers) => {
            for father in fathers {
                println!("{father}");
            }
        }
        Err(err) => {
            log::error!("Unable to fetch fathers for {}: {}", url, err);
            println!("{}", err.user_message());
        }
    }
}

pub async fn run_stories(api: &GoogolClient, query: &str, index: bool) -> anyhow::Result<()> {
    let stories = api.related_stories(query).await;
    if let Ok(stories) = &stories {
        for story in stories {
            match &story.url {
                Some(url) => println!("{} ({})", story.title, url),
                None => println!("{}", story.title),
            }
        }
    }
    println!("{}", stories_summary(&stories));

    // A failed lookup has already been reported as "no stories".
    let Ok(stories) = stories else {
        return Ok(());
    };

    if index && !stories.is_empty() {
        match api.index_stories(&stories).await? {
            BulkIndexOutcome::AllIndexed => println!("Indexation successful"),
            BulkIndexOutcome::Failed(failed) => println!(
                "Failed to index the following URLs: {}",
                failed.join(", ")
            ),
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::{analysis_text, should_fetch_extras, stories_summary};
    use googol_client::{ClientError, PageOutcome};
    use shared::response::{SearchResultPage, Story};

    #[test]
    fn test_extras_follow_fresh_results_only() {
        assert!(should_fetch_extras(&PageOutcome::Page {
            page: SearchResultPage::default(),
            fresh: true,
        }));
        assert!(!should_fetch_extras(&PageOutcome::Page {
            page: SearchResultPage::default(),
            fresh: false,
        }));
        assert!(!should_fetch_extras(&PageOutcome::Empty));
        assert!(!should_fetch_extras(&PageOutcome::Failed(
            ClientError::NoResults
        )));
        assert!(!should_fetch_extras(&PageOutcome::Stale));
    }

    #[test]
    fn test_stories_summary() {
        let story = Story {
            id: 1,
            title: "Show HN".into(),
            url: None,
        };

        assert_eq!(
            stories_summary(&Ok(vec![story.clone(), story])),
            "Found 2 Hacker News stories matching your search."
        );
        assert_eq!(
            stories_summary(&Ok(Vec::new())),
            "No matching Hacker News stories found."
        );
        assert_eq!(
            stories_summary(&Err(ClientError::NoResults)),
            "No matching Hacker News stories found."
        );
    }

    #[test]
    fn test_analysis_fallback() {
        assert_eq!(analysis_text(Ok("summary".into())), "summary");
        assert_eq!(analysis_text(Ok("  ".into())), "Couldn't fetch analysis");
        assert_eq!(
            analysis_text(Err(ClientError::NoResults)),
            "Couldn't fetch analysis"
        );
    }
}
