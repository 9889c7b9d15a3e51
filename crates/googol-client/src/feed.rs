use futures::StreamExt;
use shared::config::FeedEndpoint;
use shared::event::FeedEvent;
use shared::response::StatusSnapshot;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::api::GoogolClient;
use crate::error::{ClientResult, DecodeError};
use crate::status::decode_status;

type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Receives decoded status updates and connection lifecycle events.
pub trait StatusRenderer {
    /// Called once per inbound message, in arrival order.
    fn render(&mut self, update: Result<StatusSnapshot, DecodeError>);

    fn on_event(&mut self, _event: &FeedEvent) {}
}

/// What happened during a single connection to the feed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Number of data messages handed to the renderer.
    pub messages: usize,
    /// The session ended because shutdown was requested.
    pub shutdown: bool,
    pub error: Option<String>,
}

/// Connects to the backend's status socket and turns each pushed message into
/// a [`StatusSnapshot`]. A dropped connection is reported, never retried here.
#[derive(Clone, Debug)]
pub struct StatusFeedClient {
    endpoint: FeedEndpoint,
}

impl StatusFeedClient {
    pub fn new(endpoint: FeedEndpoint) -> Self {
        Self { endpoint }
    }

    /// Asks the backend where its status socket lives.
    pub async fn from_backend(api: &GoogolClient) -> ClientResult<Self> {
        let endpoint = api.feed_endpoint().await?;
        Ok(Self::new(endpoint))
    }

    pub fn endpoint(&self) -> &FeedEndpoint {
        &self.endpoint
    }

    async fn connect(&self) -> ClientResult<FeedStream> {
        let url = self.endpoint.url();
        log::info!("connecting to status feed @ {}", url);
        let (stream, _) = connect_async(url.as_str()).await?;
        Ok(stream)
    }

    /// Connects and processes messages until the socket closes, errors, or
    /// `shutdown` fires.
    pub async fn run<R: StatusRenderer>(
        &self,
        renderer: &mut R,
        mut shutdown: Option<&mut broadcast::Receiver<()>>,
    ) -> ClientResult<SessionSummary> {
        let connected = tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => {
                log::info!("shutdown requested while connecting to status feed");
                return Ok(SessionSummary {
                    shutdown: true,
                    ..Default::default()
                });
            }
            connected = self.connect() => connected,
        };

        let mut stream = match connected {
            Ok(stream) => stream,
            Err(err) => {
                log::error!("unable to connect to status feed: {}", err);
                renderer.on_event(&FeedEvent::Disconnected {
                    error: Some(err.to_string()),
                });
                return Err(err);
            }
        };

        log::info!("status feed connection established");
        renderer.on_event(&FeedEvent::Connected);

        let mut summary = SessionSummary::default();
        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => {
                    log::info!("closing status feed");
                    if let Err(err) = stream.close(None).await {
                        log::debug!("error closing status feed: {}", err);
                    }
                    summary.shutdown = true;
                    break;
                }
                next = stream.next() => {
                    match next {
                        Some(Ok(Message::Text(text))) => {
                            summary.messages += 1;
                            renderer.render(decode_status(Some(&text)));
                        }
                        Some(Ok(Message::Binary(bytes))) => {
                            summary.messages += 1;
                            let update = match String::from_utf8(bytes) {
                                Ok(text) => decode_status(Some(&text)),
                                Err(_) => Err(DecodeError::MalformedPayload(
                                    "binary message is not valid UTF-8".into(),
                                )),
                            };
                            renderer.render(update);
                        }
                        Some(Ok(Message::Close(frame))) => {
                            log::info!("status feed closed by server: {:?}", frame);
                            break;
                        }
                        // Ping/pong are answered by the transport.
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            log::error!("status feed error: {}", err);
                            summary.error = Some(err.to_string());
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        log::info!("status feed connection closed");
        renderer.on_event(&FeedEvent::Disconnected {
            error: summary.error.clone(),
        });

        Ok(summary)
    }
}

async fn wait_for_shutdown(shutdown: &mut Option<&mut broadcast::Receiver<()>>) {
    match shutdown {
        // A closed channel also means nobody wants the feed anymore.
        Some(rx) => {
            let _ = rx.recv().await;
        }
        None => futures::future::pending::<()>().await,
    }
}
