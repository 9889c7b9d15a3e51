//! Interactive console: a search box with paging, an operation selector and a
//! toggleable admin panel showing the live status feed.
use chrono::Local;
use googol_client::menu::{AdminPanel, MenuEffect, MenuInput, OperationMenu};
use googol_client::{
    ClientResult, DecodeError, FeedSupervisor, GoogolClient, PageOutcome, PageRequest,
    SearchPager, StatusFeedClient, StatusRenderer,
};
use shared::config::Config;
use shared::event::{FeedEvent, OperationType};
use shared::response::{SearchResultPage, StatusSnapshot};
use std::io::{BufRead, BufReader};
use std::thread;
use tokio::sync::{broadcast, mpsc};

use crate::render::{format_page, format_snapshot};
use crate::search;

const HELP: &str = "\
Commands:
  <text>               run the current operation (search, index, fathers)
  n / p                next / previous result page
  :search :index :fathers
                       switch operation
  :admin               toggle the system status panel
  :help                show this message
  q                    quit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Submit(String),
    NextPage,
    PreviousPage,
    SwitchOperation(OperationType),
    ToggleAdmin,
    Help,
    Quit,
    Unknown(String),
    Nothing,
}

pub fn parse_command(line: &str) -> ConsoleCommand {
    let line = line.trim();
    match line {
        "" => ConsoleCommand::Nothing,
        "n" => ConsoleCommand::NextPage,
        "p" => ConsoleCommand::PreviousPage,
        "q" | ":q" | ":quit" => ConsoleCommand::Quit,
        ":admin" => ConsoleCommand::ToggleAdmin,
        ":help" | "?" => ConsoleCommand::Help,
        cmd if cmd.starts_with(':') => match cmd[1..].parse::<OperationType>() {
            Ok(op) => ConsoleCommand::SwitchOperation(op),
            Err(_) => ConsoleCommand::Unknown(cmd.to_string()),
        },
        text => ConsoleCommand::Submit(text.to_string()),
    }
}

enum ConsoleMessage {
    Page(PageRequest, ClientResult<SearchResultPage>),
    Status(Result<StatusSnapshot, DecodeError>),
    Feed(FeedEvent),
}

/// Forwards feed output to the console loop.
struct ChannelRenderer {
    tx: mpsc::UnboundedSender<ConsoleMessage>,
}

impl StatusRenderer for ChannelRenderer {
    fn render(&mut self, update: Result<StatusSnapshot, DecodeError>) {
        let _ = self.tx.send(ConsoleMessage::Status(update));
    }

    fn on_event(&mut self, event: &FeedEvent) {
        let _ = self.tx.send(ConsoleMessage::Feed(event.clone()));
    }
}

struct Console {
    api: GoogolClient,
    config: Config,
    pager: SearchPager,
    menu: OperationMenu,
    panel: AdminPanel,
    tx: mpsc::UnboundedSender<ConsoleMessage>,
    // Stops the admin panel's feed without ending the console.
    feed_shutdown: Option<broadcast::Sender<()>>,
}

impl Console {
    fn switch_operation(&mut self, op: OperationType) {
        let inputs = [
            MenuInput::PointerEnter,
            MenuInput::Select(op),
            MenuInput::PointerLeave,
            MenuInput::TransitionFinished,
        ];

        for input in inputs {
            if let Some(MenuEffect::OperationChanged(op)) = self.menu.handle(input) {
                println!("Operation: {op}");
            }
        }
    }

    fn dispatch_search(&self, request: PageRequest) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.search(&request.param).await;
            let _ = tx.send(ConsoleMessage::Page(request, result));
        });
    }

    fn submit(&mut self, text: String) {
        match self.menu.operation() {
            OperationType::Search => {
                if let Some(request) = self.pager.submit(&text) {
                    self.dispatch_search(request);
                }
            }
            OperationType::Index => {
                let api = self.api.clone();
                let urls = text
                    .split_whitespace()
                    .map(|url| url.to_string())
                    .collect::<Vec<_>>();
                tokio::spawn(async move {
                    match api.index(&urls).await {
                        Ok(report) => println!("{}", report.message),
                        Err(err) => {
                            log::error!("Unable to index: {}", err);
                            println!("{}", err.user_message());
                        }
                    }
                });
            }
            OperationType::Fathers => {
                let api = self.api.clone();
                tokio::spawn(async move { search::print_fathers(&api, &text).await });
            }
        }
    }

    fn toggle_admin(&mut self) {
        self.panel = self.panel.toggle();
        if !self.panel.is_open() {
            if let Some(shutdown) = self.feed_shutdown.take() {
                let _ = shutdown.send(());
            }
            println!("Admin panel closed");
            return;
        }

        println!("Admin panel open, waiting for status...");
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        self.feed_shutdown = Some(shutdown_tx);

        let api = self.api.clone();
        let fallback = self.config.user_settings.feed.clone();
        let settings = self.config.user_settings.reconnect.clone();
        let mut renderer = ChannelRenderer {
            tx: self.tx.clone(),
        };

        tokio::spawn(async move {
            let client = match StatusFeedClient::from_backend(&api).await {
                Ok(client) => client,
                Err(err) => {
                    log::warn!("{}, using {}", err, fallback);
                    StatusFeedClient::new(fallback)
                }
            };

            FeedSupervisor::new(client, settings)
                .run(&mut renderer, &mut shutdown_rx)
                .await;
        });
    }

    fn handle_message(&mut self, msg: ConsoleMessage) {
        match msg {
            ConsoleMessage::Page(request, result) => {
                let outcome = self.pager.complete(&request, result);
                if search::should_fetch_extras(&outcome) {
                    let api = self.api.clone();
                    let query = request.param.query.clone();
                    tokio::spawn(async move { search::print_extras(&api, &query).await });
                }

                match outcome {
                    PageOutcome::Page { page, .. } => {
                        print!("{}", format_page(&page, self.pager.page()))
                    }
                    PageOutcome::Empty => println!("No results found!"),
                    PageOutcome::Failed(err) => println!("{}", err.user_message()),
                    PageOutcome::Stale => {}
                }
            }
            // Updates that arrive after the panel was closed are dropped.
            ConsoleMessage::Status(_) | ConsoleMessage::Feed(_) if !self.panel.is_open() => {}
            ConsoleMessage::Status(Ok(snapshot)) => {
                print!("{}", format_snapshot(&snapshot, Local::now()))
            }
            ConsoleMessage::Status(Err(err)) => {
                log::error!("Error processing status message: {}", err);
                println!("An error has occurred");
            }
            ConsoleMessage::Feed(FeedEvent::Connected) => {}
            ConsoleMessage::Feed(event) => println!("[status feed] {event}"),
        }
    }

    /// Returns false once the console should exit.
    fn handle_command(&mut self, cmd: ConsoleCommand) -> bool {
        match cmd {
            ConsoleCommand::Submit(text) => self.submit(text),
            ConsoleCommand::NextPage => match self.pager.next_page() {
                Some(request) => self.dispatch_search(request),
                None => println!("Already on the last page"),
            },
            ConsoleCommand::PreviousPage => match self.pager.previous_page() {
                Some(request) => self.dispatch_search(request),
                None => println!("Already on the first page"),
            },
            ConsoleCommand::SwitchOperation(op) => self.switch_operation(op),
            ConsoleCommand::ToggleAdmin => self.toggle_admin(),
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Unknown(cmd) => println!("Unknown command `{cmd}`, try :help"),
            ConsoleCommand::Nothing => {}
            ConsoleCommand::Quit => return false,
        }

        true
    }
}

/// Reads lines on a plain thread so a pending read never holds up runtime
/// shutdown. The channel closes at end of input.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::UnboundedReceiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    log::error!("Unable to read input: {}", err);
                    break;
                }
            }
        }
    });

    rx
}

pub async fn run(
    config: &Config,
    api: GoogolClient,
    shutdown_tx: broadcast::Sender<()>,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut shutdown_rx = shutdown_tx.subscribe();

    let mut console = Console {
        api,
        config: config.clone(),
        pager: SearchPager::new(config.user_settings.page_size),
        menu: OperationMenu::new(),
        panel: AdminPanel::default(),
        tx,
        feed_shutdown: None,
    };

    println!("{HELP}");
    let mut lines = spawn_line_reader(BufReader::new(std::io::stdin()));

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    break;
                };

                if !console.handle_command(parse_command(&line)) {
                    break;
                }
            }
            Some(msg) = rx.recv() => console.handle_message(msg),
            _ = shutdown_rx.recv() => break,
        }
    }

    if let Some(shutdown) = console.feed_shutdown.take() {
        let _ = shutdown.send(());
    }

    Ok(())
}
