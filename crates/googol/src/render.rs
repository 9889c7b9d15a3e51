use std::fmt::Write;

use chrono::{DateTime, Local};
use googol_client::{DecodeError, StatusRenderer};
use shared::event::FeedEvent;
use shared::response::{SearchResultPage, StatusSnapshot};

pub fn format_snapshot(snapshot: &StatusSnapshot, received_at: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== system status @ {}", received_at.format("%H:%M:%S"));

    let _ = writeln!(out, "BARRELS");
    for barrel in &snapshot.barrels {
        let _ = writeln!(out, "  {}", barrel.name());
        let _ = writeln!(out, "    Host: {}", barrel.host());
        let _ = writeln!(
            out,
            "    Average Response Time: {}",
            barrel.average_response_time_ms
        );
        let _ = writeln!(out, "    Load: {}", barrel.load);
        let _ = writeln!(out, "    Request Count: {}", barrel.request_count);
    }

    let _ = writeln!(out, "DOWNLOADERS");
    for id in &snapshot.downloader_ids {
        let _ = writeln!(out, "  {id}");
    }

    let _ = writeln!(out, "URLS TO PROCESS");
    let _ = writeln!(out, "  {}", snapshot.urls_pending_count);

    let _ = writeln!(out, "TOP TEN SEARCHES");
    for search in &snapshot.top_searches {
        let _ = writeln!(out, "  {}: {}", search.term, search.count);
    }

    out
}

pub fn format_page(page: &SearchResultPage, current_page: u32) -> String {
    let mut out = String::new();
    for row in &page.rows {
        let _ = writeln!(out, "{}", row.url());
        if let Some(title) = row.title().filter(|t| !t.is_empty()) {
            let _ = writeln!(out, "  {title}");
        }
        if let Some(snippet) = row.snippet().filter(|s| !s.is_empty()) {
            let _ = writeln!(out, "  {snippet}");
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "Page {} of {}",
        current_page + 1,
        page.last_page_index + 1
    );
    out
}

/// Prints each snapshot to stdout as it arrives.
pub struct TerminalRenderer {
    json: bool,
}

impl TerminalRenderer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl StatusRenderer for TerminalRenderer {
    fn render(&mut self, update: Result<StatusSnapshot, DecodeError>) {
        match update {
            Ok(snapshot) if self.json => match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{line}"),
                Err(err) => log::error!("Unable to serialize snapshot: {}", err),
            },
            Ok(snapshot) => print!("{}", format_snapshot(&snapshot, Local::now())),
            Err(err) => {
                log::error!("Error processing status message: {}", err);
                println!("An error has occurred");
            }
        }
    }

    fn on_event(&mut self, event: &FeedEvent) {
        match event {
            FeedEvent::Connected => log::info!("status feed connected"),
            FeedEvent::Disconnected { error: Some(err) } => {
                log::warn!("status feed disconnected: {}", err);
                eprintln!("Status feed disconnected");
            }
            FeedEvent::Disconnected { error: None } => eprintln!("Status feed closed"),
            FeedEvent::Reconnecting { attempt } => eprintln!("Reconnecting (#{attempt})..."),
            FeedEvent::GaveUp { attempts } => {
                eprintln!("Gave up on the status feed after {attempts} attempts")
            }
        }
    }
}
