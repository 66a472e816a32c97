use crate::notification_bell::error::FeedError;
use adminbell_shared::{decode_snapshot, keep_latest, NotificationRecord};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Payload of a streamed `put` / `patch` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedEvent {
    pub path: String,
    pub data: Value,
}

/// Client-side copy of the queried subtree, rebuilt from streamed events.
#[derive(Debug, Default)]
pub struct LocalMirror {
    root: Value,
}

impl LocalMirror {
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Replaces the value at `path`. `null` deletes it.
    pub fn put(&mut self, path: &str, data: Value) {
        let segs = segments(path);
        put_at(&mut self.root, &segs, data);
    }

    /// Writes every child of `data` below `path`, leaving siblings alone.
    pub fn patch(&mut self, path: &str, data: Value) {
        let Value::Object(children) = data else {
            self.put(path, data);
            return;
        };
        let base = segments(path);
        for (key, value) in children {
            let mut segs = base.clone();
            segs.extend(segments(&key));
            put_at(&mut self.root, &segs, value);
        }
    }

    /// The `limit` most recent records, oldest first.
    pub fn snapshot(&self, limit: usize) -> Vec<NotificationRecord> {
        let decoded = decode_snapshot(&self.root);
        for r in &decoded.rejected {
            warn!("skipping notification {}: {}", r.id, r.reason);
        }
        keep_latest(decoded.records, limit)
    }

    /// Applies one named stream event. Returns a fresh snapshot when the
    /// mirror changed, `None` for housekeeping events.
    pub fn apply_sse(
        &mut self,
        event: &str,
        data: &str,
        limit: usize,
    ) -> Result<Option<Vec<NotificationRecord>>, FeedError> {
        match event {
            "put" | "patch" => {
                let ev: FeedEvent = serde_json::from_str(data)?;
                if event == "put" {
                    self.put(&ev.path, ev.data);
                } else {
                    self.patch(&ev.path, ev.data);
                }
                Ok(Some(self.snapshot(limit)))
            }
            "keep-alive" => Ok(None),
            "cancel" => {
                let reason = serde_json::from_str::<Value>(data)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| data.to_string());
                Err(FeedError::Cancelled(reason))
            }
            "auth_revoked" => Err(FeedError::Cancelled("auth revoked".to_string())),
            other => {
                debug!("ignoring stream event {other:?}");
                Ok(None)
            }
        }
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn put_at(node: &mut Value, path: &[String], data: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = data;
        return;
    };
    if data.is_null() {
        remove_at(node, path);
        return;
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        put_at(child, rest, data);
    }
}

// Empty objects collapse to null on the way back up, like the server does.
fn remove_at(node: &mut Value, path: &[String]) {
    let Some((head, rest)) = path.split_first() else {
        *node = Value::Null;
        return;
    };
    let Value::Object(map) = &mut *node else {
        return;
    };

    if rest.is_empty() {
        map.remove(head);
    } else if let Some(child) = map.get_mut(head) {
        remove_at(child, rest);
        let gone = child.is_null() || child.as_object().is_some_and(|m| m.is_empty());
        if gone {
            map.remove(head);
        }
    }

    if map.is_empty() {
        *node = Value::Null;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(records: &[NotificationRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn initial_put_then_child_put() {
        let mut m = LocalMirror::default();
        m.put("/", json!({ "a": { "timestamp": 1 }, "b": { "timestamp": 2 } }));
        m.put("/c", json!({ "timestamp": 3, "title": "third" }));

        let snap = m.snapshot(50);
        assert_eq!(ids(&snap), vec!["a", "b", "c"]);
        assert_eq!(snap[2].title_text(), "third");
    }

    #[test]
    fn patch_merges_multi_segment_keys() {
        let mut m = LocalMirror::default();
        m.put("/", json!({ "a": { "timestamp": 1 }, "b": { "timestamp": 2 } }));
        m.patch("/", json!({ "a/read": true, "b/read": true }));

        assert!(m.snapshot(50).iter().all(|r| r.read));
        assert_eq!(m.root()["a"]["timestamp"], json!(1));
    }

    #[test]
    fn null_put_removes_and_collapses() {
        let mut m = LocalMirror::default();
        m.put("/", json!({ "a": { "timestamp": 1 } }));
        m.put("/a/timestamp", Value::Null);
        assert_eq!(m.root(), &Value::Null);
        assert!(m.snapshot(50).is_empty());
    }

    #[test]
    fn snapshot_respects_limit() {
        let mut m = LocalMirror::default();
        for i in 0..5 {
            m.put(&format!("/n{i}"), json!({ "timestamp": i }));
        }
        assert_eq!(ids(&m.snapshot(2)), vec!["n3", "n4"]);
    }

    #[test]
    fn stream_events() {
        let mut m = LocalMirror::default();
        let snap = m
            .apply_sse("put", r#"{"path":"/","data":{"x":{"timestamp":5}}}"#, 50)
            .unwrap();
        assert_eq!(snap.map(|s| s.len()), Some(1));

        assert!(m.apply_sse("keep-alive", "null", 50).unwrap().is_none());
        assert!(matches!(
            m.apply_sse("cancel", r#""Permission denied""#, 50),
            Err(FeedError::Cancelled(reason)) if reason == "Permission denied"
        ));
        assert!(matches!(
            m.apply_sse("auth_revoked", "credential is no longer valid", 50),
            Err(FeedError::Cancelled(_))
        ));
        assert!(matches!(
            m.apply_sse("put", "not json", 50),
            Err(FeedError::Decode(_))
        ));
    }
}
