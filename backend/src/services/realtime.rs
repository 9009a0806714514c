//! Realtime change feed
//!
//! Every mutation publishes a [`ChangeEvent`] into one broadcast channel.
//! Subscribers receive only the events of their own establishment and use
//! them to invalidate cached views; the payload never carries row data.

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

/// Kind of change applied to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
    /// Events were dropped; every cached view must be refetched
    Resync,
}

/// A row-level change notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub establishment_id: Uuid,
    /// Table that changed, e.g. `orders`
    pub table: String,
    pub action: ChangeAction,
    pub record_id: Uuid,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(establishment_id: Uuid, table: &str, action: ChangeAction, record_id: Uuid) -> Self {
        Self {
            establishment_id,
            table: table.to_string(),
            action,
            record_id,
            at: Utc::now(),
        }
    }

    /// Tells a subscriber that it missed events
    pub fn resync(establishment_id: Uuid) -> Self {
        Self::new(establishment_id, RESYNC_TABLE, ChangeAction::Resync, Uuid::nil())
    }
}

/// Table name carried by resync events
pub const RESYNC_TABLE: &str = "*";

/// Fan-out hub for change events
#[derive(Clone)]
pub struct RealtimeHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Having no listeners is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::trace!(
            establishment_id = %event.establishment_id,
            table = %event.table,
            action = ?event.action,
            "Publishing change event"
        );
        let _ = self.tx.send(event);
    }

    /// Convenience wrapper around [`publish`](Self::publish)
    pub fn notify(&self, establishment_id: Uuid, table: &str, action: ChangeAction, record_id: Uuid) {
        self.publish(ChangeEvent::new(establishment_id, table, action, record_id));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Stream of the events of one establishment. A lagging subscriber gets
    /// one resync event in place of the messages it missed.
    pub fn subscribe(&self, establishment_id: Uuid) -> impl Stream<Item = ChangeEvent> + Send + 'static {
        let rx = self.tx.subscribe();
        stream::unfold(rx, move |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.establishment_id == establishment_id => {
                        return Some((event, rx));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(%establishment_id, skipped, "Realtime subscriber lagged");
                        return Some((ChangeEvent::resync(establishment_id), rx));
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_publish_without_listeners() {
        let hub = RealtimeHub::new(8);
        hub.notify(Uuid::new_v4(), "orders", ChangeAction::Insert, Uuid::new_v4());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_filters_by_establishment() {
        let hub = RealtimeHub::new(16);
        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();

        let stream = hub.subscribe(mine);
        futures::pin_mut!(stream);

        let order_id = Uuid::new_v4();
        hub.notify(other, "orders", ChangeAction::Insert, Uuid::new_v4());
        hub.notify(mine, "orders", ChangeAction::Update, order_id);

        let event = stream.next().await.unwrap();
        assert_eq!(event.establishment_id, mine);
        assert_eq!(event.record_id, order_id);
        assert_eq!(event.action, ChangeAction::Update);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_gets_resync() {
        let hub = RealtimeHub::new(2);
        let mine = Uuid::new_v4();
        let stream = hub.subscribe(mine);
        futures::pin_mut!(stream);

        for _ in 0..5 {
            hub.notify(mine, "orders", ChangeAction::Insert, Uuid::new_v4());
        }
        let last = Uuid::new_v4();
        hub.notify(mine, "orders", ChangeAction::Update, last);

        let first = stream.next().await.unwrap();
        assert_eq!(first.action, ChangeAction::Resync);
        assert_eq!(first.table, RESYNC_TABLE);
        assert_eq!(first.establishment_id, mine);

        let mut tail = Vec::new();
        while tail.last() != Some(&last) {
            tail.push(stream.next().await.unwrap().record_id);
        }
        assert_eq!(tail.len(), 2);
    }

    #[tokio::test]
    async fn test_stream_ends_when_hub_dropped() {
        let hub = RealtimeHub::new(4);
        let stream = hub.subscribe(Uuid::new_v4());
        drop(hub);
        futures::pin_mut!(stream);
        assert!(stream.next().await.is_none());
    }
}
