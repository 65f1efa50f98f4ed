use crate::error::Error;
use std::{fmt::Debug, sync::Mutex};

/// Publishes a message onto an exchange of the message broker.
///
/// Returns `Ok(false)` when the broker refused the message and an error when
/// it could not be reached at all.
pub trait MessagePublisher: Debug {
    fn publish(&self, message: &str, exchange: &str, routing_key: &str) -> Result<bool, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub body: String,
    pub exchange: String,
    pub routing_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Accept,
    Reject,
    Unreachable,
}

/// Keeps published messages in memory instead of sending them to a broker.
#[derive(Debug)]
pub struct RecordingPublisher {
    behaviour: Behaviour,
    published: Mutex<Vec<PublishedMessage>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::with_behaviour(Behaviour::Accept)
    }

    /// A publisher whose broker answers every publish with a refusal.
    pub fn rejecting() -> Self {
        Self::with_behaviour(Behaviour::Reject)
    }

    /// A publisher that cannot reach its broker.
    pub fn unreachable() -> Self {
        Self::with_behaviour(Behaviour::Unreachable)
    }

    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .map(|published| published.clone())
            .unwrap_or_default()
    }
}

impl MessagePublisher for RecordingPublisher {
    fn publish(&self, message: &str, exchange: &str, routing_key: &str) -> Result<bool, Error> {
        match self.behaviour {
            Behaviour::Unreachable => Err(Error::Publish {
                exchange: exchange.into(),
                reason: String::from("broker unreachable"),
            }),
            Behaviour::Reject => Ok(false),
            Behaviour::Accept => {
                let mut published = self.published.lock().map_err(|_| Error::Publish {
                    exchange: exchange.into(),
                    reason: String::from("the lock was poisoned"),
                })?;
                published.push(PublishedMessage {
                    body: message.into(),
                    exchange: exchange.into(),
                    routing_key: routing_key.into(),
                });
                Ok(true)
            }
        }
    }
}

impl Default for RecordingPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accepted_messages() {
        let publisher = RecordingPublisher::new();

        assert!(publisher.publish("{}", "ei-exchange", "#").unwrap());
        assert_eq!(
            publisher.published(),
            vec![PublishedMessage {
                body: "{}".into(),
                exchange: "ei-exchange".into(),
                routing_key: "#".into(),
            }]
        );
    }

    #[test]
    fn rejecting_and_unreachable_publishers_record_nothing() {
        let rejecting = RecordingPublisher::rejecting();
        assert!(!rejecting.publish("{}", "x", "k").unwrap());
        assert!(rejecting.published().is_empty());

        let unreachable = RecordingPublisher::unreachable();
        assert!(matches!(
            unreachable.publish("{}", "x", "k"),
            Err(Error::Publish { .. })
        ));
    }
}
