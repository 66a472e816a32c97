// In-memory feed for widget tests. Mutations apply immediately and every
// subscriber gets a fresh snapshot after each write, like a live query would.

use super::{NotificationFeed, SnapshotStream};
use crate::notification_bell::error::FeedError;
use adminbell_shared::{keep_latest, sort_feed_order, MultiPathUpdate, NotificationRecord};
use async_trait::async_trait;
use futures_channel::mpsc::{unbounded, UnboundedSender};
use futures_util::StreamExt;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedCall {
    QueryEqual { field: String, value: Value },
    UpdateMany(MultiPathUpdate),
    UpdateField { id: String, field: String, value: Value },
}

type Subscriber = (usize, UnboundedSender<Result<Vec<NotificationRecord>, FeedError>>);

#[derive(Default)]
pub struct MemoryFeed {
    records: RefCell<BTreeMap<String, NotificationRecord>>,
    subscribers: RefCell<Vec<Subscriber>>,
    calls: RefCell<Vec<FeedCall>>,
    fail_writes: Cell<bool>,
    before_write: RefCell<Option<Rc<dyn Fn()>>>,
}

impl MemoryFeed {
    pub fn with_records(records: impl IntoIterator<Item = NotificationRecord>) -> Rc<Self> {
        let feed = Self::default();
        {
            let mut map = feed.records.borrow_mut();
            for r in records {
                map.insert(r.id.clone(), r);
            }
        }
        Rc::new(feed)
    }

    /// Inserts or replaces a record and notifies subscribers.
    pub fn push(&self, record: NotificationRecord) {
        self.records.borrow_mut().insert(record.id.clone(), record);
        self.broadcast();
    }

    pub fn calls(&self) -> Vec<FeedCall> {
        self.calls.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|(_, tx)| !tx.is_closed())
            .count()
    }

    pub fn record(&self, id: &str) -> Option<NotificationRecord> {
        self.records.borrow().get(id).cloned()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Runs `hook` when a write is called, before it is applied.
    pub fn on_write(&self, hook: impl Fn() + 'static) {
        *self.before_write.borrow_mut() = Some(Rc::new(hook));
    }

    /// Ends every live subscription the way a dropped connection would.
    pub fn close_subscriptions(&self) {
        let subs = std::mem::take(&mut *self.subscribers.borrow_mut());
        for (_, tx) in subs {
            let _ = tx.unbounded_send(Err(FeedError::Closed));
            tx.close_channel();
        }
    }

    fn snapshot(&self, limit: usize) -> Vec<NotificationRecord> {
        let mut all: Vec<_> = self.records.borrow().values().cloned().collect();
        sort_feed_order(&mut all);
        keep_latest(all, limit)
    }

    fn broadcast(&self) {
        let subs: Vec<_> = self.subscribers.borrow().clone();
        for (limit, tx) in subs {
            let _ = tx.unbounded_send(Ok(self.snapshot(limit)));
        }
        self.subscribers.borrow_mut().retain(|(_, tx)| !tx.is_closed());
    }

    fn begin_write(&self) -> Result<(), FeedError> {
        let hook = self.before_write.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
        if self.fail_writes.get() {
            return Err(FeedError::Status {
                status: 401,
                body: "Permission denied".to_string(),
            });
        }
        Ok(())
    }

    fn set_field(&self, id: &str, field: &str, value: &Value) {
        let mut records = self.records.borrow_mut();
        let Some(record) = records.get_mut(id) else {
            return;
        };
        if field == "read" {
            record.read = value.as_bool() == Some(true);
        }
    }
}

#[async_trait(?Send)]
impl NotificationFeed for MemoryFeed {
    fn subscribe_latest(&self, limit: usize) -> SnapshotStream {
        let (tx, rx) = unbounded();
        let _ = tx.unbounded_send(Ok(self.snapshot(limit)));
        self.subscribers.borrow_mut().push((limit, tx));
        rx.boxed_local()
    }

    async fn query_equal(
        &self,
        field: &str,
        value: Value,
    ) -> Result<Vec<NotificationRecord>, FeedError> {
        self.calls.borrow_mut().push(FeedCall::QueryEqual {
            field: field.to_string(),
            value: value.clone(),
        });
        let matches = self
            .records
            .borrow()
            .values()
            .filter(|r| field == "read" && Value::Bool(r.read) == value)
            .cloned()
            .collect();
        Ok(matches)
    }

    async fn update_many(&self, update: &MultiPathUpdate) -> Result<(), FeedError> {
        self.calls
            .borrow_mut()
            .push(FeedCall::UpdateMany(update.clone()));
        self.begin_write()?;
        for (path, value) in update.entries() {
            if let Some((id, field)) = path.split_once('/') {
                self.set_field(id, field, value);
            }
        }
        self.broadcast();
        Ok(())
    }

    async fn update_field(&self, id: &str, field: &str, value: Value) -> Result<(), FeedError> {
        self.calls.borrow_mut().push(FeedCall::UpdateField {
            id: id.to_string(),
            field: field.to_string(),
            value: value.clone(),
        });
        self.begin_write()?;
        self.set_field(id, field, &value);
        self.broadcast();
        Ok(())
    }
}
