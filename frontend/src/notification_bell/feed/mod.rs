// frontend/src/notification_bell/feed/mod.rs
//
// The notification feed as the bell sees it: one live query plus three
// one-shot operations. `FirebaseFeed` is the production binding; tests use
// the in-memory feed.

mod firebase;
#[cfg(test)]
pub(crate) mod memory;
mod mirror;
mod sse;

pub use firebase::FirebaseFeed;
pub use mirror::{FeedEvent, LocalMirror};
pub use sse::{SseDecoder, SseEvent};

use super::error::FeedError;
use adminbell_shared::{MultiPathUpdate, NotificationRecord};
use async_trait::async_trait;
use futures_util::stream::LocalBoxStream;
use serde_json::Value;

/// Full snapshots in feed order (oldest first). Every item replaces the previous one.
pub type SnapshotStream = LocalBoxStream<'static, Result<Vec<NotificationRecord>, FeedError>>;

#[async_trait(?Send)]
pub trait NotificationFeed {
    /// Live view of the `limit` most recent records ordered by `timestamp`.
    /// Dropping the stream ends the subscription.
    fn subscribe_latest(&self, limit: usize) -> SnapshotStream;

    /// One-shot read of every record whose `field` equals `value`.
    async fn query_equal(
        &self,
        field: &str,
        value: Value,
    ) -> Result<Vec<NotificationRecord>, FeedError>;

    /// Applies all relative paths of `update` in one atomic write.
    async fn update_many(&self, update: &MultiPathUpdate) -> Result<(), FeedError>;

    /// Sets a single field of record `id`.
    async fn update_field(&self, id: &str, field: &str, value: Value) -> Result<(), FeedError>;
}
