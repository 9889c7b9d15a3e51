use std::time::Duration;

use shared::config::ReconnectSettings;
use shared::event::FeedEvent;
use tokio::sync::broadcast;
use tokio_retry::strategy::{jitter, ExponentialBackoff};

use crate::feed::{StatusFeedClient, StatusRenderer};

/// Keeps a status feed alive by reconnecting with jittered exponential
/// backoff. The feed client itself never reconnects, this sits on top of it.
pub struct FeedSupervisor {
    client: StatusFeedClient,
    settings: ReconnectSettings,
}

impl FeedSupervisor {
    pub fn new(client: StatusFeedClient, settings: ReconnectSettings) -> Self {
        Self { client, settings }
    }

    fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        if !self.settings.enabled {
            return Box::new(std::iter::empty());
        }

        // ExponentialBackoff raises the base to the nth power, so use a base of
        // 2 and scale it so the first delay lands on `initial_delay_ms`.
        let factor = (self.settings.initial_delay_ms / 2).max(1);
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(Duration::from_millis(self.settings.max_delay_ms))
            .map(jitter)
            .take(self.settings.max_retries);

        Box::new(strategy)
    }

    /// Runs until shutdown, or until reconnecting has failed `max_retries`
    /// times in a row. Returns the last lifecycle event.
    pub async fn run<R: StatusRenderer>(
        &self,
        renderer: &mut R,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> FeedEvent {
        let mut delays = self.delays();
        let mut attempts = 0;

        loop {
            match self.client.run(renderer, Some(&mut *shutdown)).await {
                Ok(summary) if summary.shutdown => {
                    return FeedEvent::Disconnected { error: None };
                }
                // A session that got data resets the backoff.
                Ok(summary) if summary.messages > 0 => {
                    delays = self.delays();
                    attempts = 0;
                }
                _ => {}
            }

            attempts += 1;
            let Some(delay) = delays.next() else {
                if !self.settings.enabled {
                    return FeedEvent::Disconnected { error: None };
                }

                log::warn!("giving up on status feed after {} attempts", attempts);
                let event = FeedEvent::GaveUp { attempts };
                renderer.on_event(&event);
                return event;
            };

            let event = FeedEvent::Reconnecting { attempt: attempts };
            log::info!("reconnecting to status feed in {:?} (#{})", delay, attempts);
            renderer.on_event(&event);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => {
                    return FeedEvent::Disconnected { error: None };
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::FeedSupervisor;
    use crate::feed::StatusFeedClient;
    use shared::config::{FeedEndpoint, ReconnectSettings};
    use std::time::Duration;

    #[test]
    fn test_backoff_is_bounded() {
        let settings = ReconnectSettings {
            enabled: true,
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            max_retries: 6,
        };

        let supervisor =
            FeedSupervisor::new(StatusFeedClient::new(FeedEndpoint::default()), settings);
        let delays = supervisor.delays().collect::<Vec<_>>();

        assert_eq!(delays.len(), 6);
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(1_000)));
    }

    #[test]
    fn test_disabled_never_retries() {
        let supervisor = FeedSupervisor::new(
            StatusFeedClient::new(FeedEndpoint::default()),
            ReconnectSettings::default(),
        );
        assert_eq!(supervisor.delays().count(), 0);
    }
}
