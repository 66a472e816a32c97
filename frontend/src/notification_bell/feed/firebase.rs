// frontend/src/notification_bell/feed/firebase.rs
//
// Realtime Database REST binding.
//   live query   GET   <db>/<path>.json?orderBy="timestamp"&limitToLast=N  (text/event-stream)
//   filter read  GET   <db>/<path>.json?orderBy="<field>"&equalTo=<json>
//   multi-path   PATCH <db>/<path>.json
//   one field    PATCH <db>/<path>/<id>.json

use super::{NotificationFeed, SnapshotStream};
use crate::notification_bell::config::{normalize_feed_path, BellConfig};
use crate::notification_bell::error::FeedError;
use adminbell_shared::{decode_snapshot, MultiPathUpdate, NotificationRecord};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::{Map, Value};
use tracing::{info, warn};
use url::Url;

#[cfg(not(target_arch = "wasm32"))]
const CONNECT_TIMEOUT_MS: u64 = 8000;

pub struct FirebaseFeed {
    database_url: Url,
    path: Vec<String>,
    auth: Option<String>,

    #[cfg(not(target_arch = "wasm32"))]
    client: reqwest::Client,
}

impl FirebaseFeed {
    pub fn new(config: &BellConfig) -> Result<Self, FeedError> {
        config
            .validate()
            .map_err(|e| FeedError::Url(e.to_string()))?;

        let database_url = Url::parse(&config.database_url)?;
        let path = normalize_feed_path(&config.feed_path)
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        #[cfg(not(target_arch = "wasm32"))]
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_millis(CONNECT_TIMEOUT_MS))
            .build()
            .map_err(|e| FeedError::request(format!("build client failed: {e}")))?;

        Ok(Self {
            database_url,
            path,
            auth: config.auth_token.clone(),
            #[cfg(not(target_arch = "wasm32"))]
            client,
        })
    }

    /// `<db>/<feed path>/<child...>.json?<query>[&auth=..]`
    pub fn endpoint(&self, child: &[&str], query: &[(&str, String)]) -> Result<Url, FeedError> {
        self.endpoint_from(self.path.iter().map(String::as_str), child, query)
    }

    /// Same as [`endpoint`](Self::endpoint) but rooted at the database root.
    pub fn root_endpoint(&self, query: &[(&str, String)]) -> Result<Url, FeedError> {
        self.endpoint_from(std::iter::empty(), &[], query)
    }

    fn endpoint_from<'a>(
        &'a self,
        base: impl Iterator<Item = &'a str>,
        child: &[&'a str],
        query: &[(&str, String)],
    ) -> Result<Url, FeedError> {
        let mut segs: Vec<&str> = base.chain(child.iter().copied()).collect();
        let last = segs.pop().unwrap_or("");

        let mut url = self.database_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| FeedError::Url(format!("{} cannot be a base", self.database_url)))?;
            path.clear();
            for s in segs {
                path.push(s);
            }
            path.push(&format!("{last}.json"));
        }

        if !query.is_empty() || self.auth.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
            if let Some(auth) = &self.auth {
                pairs.append_pair("auth", auth);
            }
        }
        Ok(url)
    }

    pub fn live_url(&self, limit: usize) -> Result<Url, FeedError> {
        self.endpoint(
            &[],
            &[
                ("orderBy", "\"timestamp\"".to_string()),
                ("limitToLast", limit.to_string()),
            ],
        )
    }

    pub fn filter_url(&self, field: &str, value: &Value) -> Result<Url, FeedError> {
        self.endpoint(
            &[],
            &[
                ("orderBy", format!("\"{field}\"")),
                ("equalTo", value.to_string()),
            ],
        )
    }

    /// Shallow reads of the database root and the feed path, for the connect screen.
    pub async fn probe(&self) -> Result<Vec<String>, FeedError> {
        let shallow = [("shallow", "true".to_string())];
        let mut report = Vec::new();

        let root = self.get_json(self.root_endpoint(&shallow)?).await?;
        report.push(format!("database reachable ({} top-level keys)", count_keys(&root)));

        let feed = self.get_json(self.endpoint(&[], &shallow)?).await?;
        report.push(format!(
            "feed /{} readable ({} records)",
            self.path.join("/"),
            count_keys(&feed)
        ));
        Ok(report)
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn get_json(&self, url: Url) -> Result<Value, FeedError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::request(e.to_string()))?;
        let resp = native::check_status(resp).await?;
        resp.json::<Value>()
            .await
            .map_err(|e| FeedError::decode(e.to_string()))
    }

    #[cfg(target_arch = "wasm32")]
    async fn get_json(&self, url: Url) -> Result<Value, FeedError> {
        use gloo_net::http::Request;

        let resp = Request::get(url.as_str())
            .send()
            .await
            .map_err(|e| FeedError::request(e.to_string()))?;
        let resp = web::check_status(resp).await?;
        resp.json::<Value>()
            .await
            .map_err(|e| FeedError::decode(e.to_string()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn patch_json(&self, url: Url, body: &Value) -> Result<(), FeedError> {
        let resp = self
            .client
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(|e| FeedError::request(e.to_string()))?;
        native::check_status(resp).await.map(|_| ())
    }

    #[cfg(target_arch = "wasm32")]
    async fn patch_json(&self, url: Url, body: &Value) -> Result<(), FeedError> {
        use gloo_net::http::Request;

        let resp = Request::patch(url.as_str())
            .json(body)
            .map_err(|e| FeedError::request(e.to_string()))?
            .send()
            .await
            .map_err(|e| FeedError::request(e.to_string()))?;
        web::check_status(resp).await.map(|_| ())
    }
}

#[async_trait(?Send)]
impl NotificationFeed for FirebaseFeed {
    fn subscribe_latest(&self, limit: usize) -> SnapshotStream {
        let url = match self.live_url(limit) {
            Ok(u) => u,
            Err(e) => return stream::once(async move { Err(e) }).boxed_local(),
        };
        info!("[FEED] live query on /{} (limit={limit})", self.path.join("/"));

        #[cfg(not(target_arch = "wasm32"))]
        {
            native::live_stream(self.client.clone(), url, limit)
        }

        #[cfg(target_arch = "wasm32")]
        {
            web::live_stream(url, limit)
        }
    }

    async fn query_equal(
        &self,
        field: &str,
        value: Value,
    ) -> Result<Vec<NotificationRecord>, FeedError> {
        let body = self.get_json(self.filter_url(field, &value)?).await?;
        let decoded = decode_snapshot(&body);
        for r in &decoded.rejected {
            warn!("skipping notification {}: {}", r.id, r.reason);
        }
        Ok(decoded.records)
    }

    async fn update_many(&self, update: &MultiPathUpdate) -> Result<(), FeedError> {
        self.patch_json(self.endpoint(&[], &[])?, &update.to_json())
            .await
    }

    async fn update_field(&self, id: &str, field: &str, value: Value) -> Result<(), FeedError> {
        let mut body = Map::new();
        body.insert(field.to_string(), value);
        self.patch_json(self.endpoint(&[id], &[])?, &Value::Object(body))
            .await
    }
}

fn count_keys(v: &Value) -> usize {
    v.as_object().map(|m| m.len()).unwrap_or(0)
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::super::{LocalMirror, SnapshotStream, SseDecoder};
    use crate::notification_bell::error::FeedError;
    use adminbell_shared::NotificationRecord;
    use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
    use futures_util::stream::{Stream, StreamExt};
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::task::JoinHandle;
    use tracing::debug;
    use url::Url;

    type SnapshotTx = UnboundedSender<Result<Vec<NotificationRecord>, FeedError>>;

    /// Aborts the reader task, and with it the HTTP stream, when the
    /// subscriber drops the stream.
    struct LiveQueryStream {
        rx: UnboundedReceiver<Result<Vec<NotificationRecord>, FeedError>>,
        task: JoinHandle<()>,
    }

    impl Stream for LiveQueryStream {
        type Item = Result<Vec<NotificationRecord>, FeedError>;

        fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            self.get_mut().rx.poll_next_unpin(cx)
        }
    }

    impl Drop for LiveQueryStream {
        fn drop(&mut self) {
            self.task.abort();
        }
    }

    pub(super) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, FeedError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(FeedError::Status {
            status: status.as_u16(),
            body,
        })
    }

    pub(super) fn live_stream(client: reqwest::Client, url: Url, limit: usize) -> SnapshotStream {
        let (tx, rx) = unbounded();
        let task = tokio::spawn(async move {
            if let Err(e) = pump(client, url, limit, &tx).await {
                let _ = tx.unbounded_send(Err(e));
            }
        });
        LiveQueryStream { rx, task }.boxed_local()
    }

    // Runs until the server ends the stream or the receiver is dropped.
    async fn pump(
        client: reqwest::Client,
        url: Url,
        limit: usize,
        tx: &SnapshotTx,
    ) -> Result<(), FeedError> {
        let resp = client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| FeedError::request(e.to_string()))?;
        let resp = check_status(resp).await?;

        let mut bytes = resp.bytes_stream();
        let mut decoder = SseDecoder::default();
        let mut mirror = LocalMirror::default();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| FeedError::request(format!("stream read failed: {e}")))?;
            for ev in decoder.ingest_chunk(&chunk) {
                if let Some(snapshot) = mirror.apply_sse(&ev.event, &ev.data, limit)?
                    && tx.unbounded_send(Ok(snapshot)).is_err()
                {
                    return Ok(());
                }
            }
            if tx.is_closed() {
                debug!("[FEED] subscriber gone, closing live query");
                return Ok(());
            }
        }

        if let Some(ev) = decoder.finish()
            && let Some(snapshot) = mirror.apply_sse(&ev.event, &ev.data, limit)?
        {
            let _ = tx.unbounded_send(Ok(snapshot));
        }
        Err(FeedError::Closed)
    }
}

#[cfg(target_arch = "wasm32")]
mod web {
    use super::super::{LocalMirror, SnapshotStream};
    use crate::notification_bell::error::FeedError;
    use adminbell_shared::NotificationRecord;
    use futures_channel::mpsc::{unbounded, UnboundedReceiver};
    use futures_util::stream::{self, Stream, StreamExt};
    use std::cell::RefCell;
    use std::pin::Pin;
    use std::rc::Rc;
    use std::task::{Context, Poll};
    use url::Url;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;
    use web_sys::{Event, EventSource, MessageEvent};

    const STREAM_EVENTS: [&str; 5] = ["put", "patch", "keep-alive", "cancel", "auth_revoked"];

    pub(super) async fn check_status(
        resp: gloo_net::http::Response,
    ) -> Result<gloo_net::http::Response, FeedError> {
        if resp.ok() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(FeedError::Status { status, body })
    }

    /// Closes the `EventSource` when the subscriber drops the stream.
    struct EventSourceStream {
        rx: UnboundedReceiver<Result<Vec<NotificationRecord>, FeedError>>,
        source: EventSource,
        _listeners: Box<[Closure<dyn FnMut(MessageEvent)>]>,
        _onerror: Closure<dyn FnMut(Event)>,
    }

    impl Stream for EventSourceStream {
        type Item = Result<Vec<NotificationRecord>, FeedError>;

        fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            self.get_mut().rx.poll_next_unpin(cx)
        }
    }

    impl Drop for EventSourceStream {
        fn drop(&mut self) {
            self.source.close();
        }
    }

    pub(super) fn live_stream(url: Url, limit: usize) -> SnapshotStream {
        let source = match EventSource::new(url.as_str()) {
            Ok(s) => s,
            Err(_) => {
                return stream::once(async {
                    Err(FeedError::request("failed to create EventSource"))
                })
                .boxed_local();
            }
        };

        let (tx, rx) = unbounded();
        let mirror = Rc::new(RefCell::new(LocalMirror::default()));

        let mut listeners = Vec::with_capacity(STREAM_EVENTS.len());
        for name in STREAM_EVENTS {
            let tx = tx.clone();
            let mirror = mirror.clone();
            let source_c = source.clone();
            let cb: Closure<dyn FnMut(MessageEvent)> = Closure::new(move |e: MessageEvent| {
                let data = e.data().as_string().unwrap_or_default();
                let applied = mirror.borrow_mut().apply_sse(name, &data, limit);
                match applied {
                    Ok(Some(snapshot)) => {
                        let _ = tx.unbounded_send(Ok(snapshot));
                    }
                    Ok(None) => {}
                    Err(err) => {
                        source_c.close();
                        let _ = tx.unbounded_send(Err(err));
                        tx.close_channel();
                    }
                }
            });
            let _ = source.add_event_listener_with_callback(name, cb.as_ref().unchecked_ref());
            listeners.push(cb);
        }

        // The browser reconnects on its own unless the source is CLOSED.
        let onerror: Closure<dyn FnMut(Event)> = {
            let source_c = source.clone();
            Closure::new(move |_e: Event| {
                if source_c.ready_state() == EventSource::CLOSED {
                    let _ = tx.unbounded_send(Err(FeedError::Closed));
                    tx.close_channel();
                }
            })
        };
        source.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        Box::pin(EventSourceStream {
            rx,
            source,
            _listeners: listeners.into_boxed_slice(),
            _onerror: onerror,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(auth: Option<&str>) -> FirebaseFeed {
        let cfg = BellConfig {
            database_url: "https://demo-rtdb.example.com".to_string(),
            auth_token: auth.map(str::to_string),
            ..BellConfig::default()
        };
        FirebaseFeed::new(&cfg).expect("valid config")
    }

    #[test]
    fn live_url_orders_by_timestamp() {
        let url = feed(None).live_url(50).unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo-rtdb.example.com/notifications/admin.json?orderBy=%22timestamp%22&limitToLast=50"
        );
    }

    #[test]
    fn filter_url_uses_json_literal_and_auth() {
        let url = feed(Some("tok")).filter_url("read", &Value::Bool(false)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo-rtdb.example.com/notifications/admin.json?orderBy=%22read%22&equalTo=false&auth=tok"
        );
    }

    #[test]
    fn child_and_root_endpoints() {
        let f = feed(None);
        assert_eq!(
            f.endpoint(&["-Nabc"], &[]).unwrap().as_str(),
            "https://demo-rtdb.example.com/notifications/admin/-Nabc.json"
        );
        assert_eq!(
            f.root_endpoint(&[("shallow", "true".to_string())]).unwrap().as_str(),
            "https://demo-rtdb.example.com/.json?shallow=true"
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn dropping_live_stream_closes_the_connection() {
        use std::io::{Read, Write};
        use std::net::TcpListener;
        use std::sync::mpsc;
        use std::time::Duration;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (events, seen) = mpsc::channel::<&'static str>();

        // Answers one live query, then waits for the client to hang up.
        std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = conn.read(&mut buf);
            conn.write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\n\r\n")
                .unwrap();
            conn.flush().unwrap();
            events.send("streaming").unwrap();
            conn.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
            let hung_up = match conn.read(&mut buf) {
                Ok(n) => n == 0,
                Err(e) => !matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ),
            };
            if hung_up {
                let _ = events.send("closed");
            }
        });

        let url = Url::parse(&format!("http://{addr}/notifications/admin.json")).unwrap();
        let stream = native::live_stream(reqwest::Client::new(), url, 50);

        let wait = |seen: mpsc::Receiver<&'static str>| {
            tokio::task::spawn_blocking(move || {
                let got = seen.recv_timeout(Duration::from_secs(10)).ok();
                (got, seen)
            })
        };
        let (got, seen) = wait(seen).await.unwrap();
        assert_eq!(got, Some("streaming"));

        drop(stream);
        let (got, _) = wait(seen).await.unwrap();
        assert_eq!(got, Some("closed"));
    }

    #[test]
    fn unconfigured_database_is_rejected() {
        assert!(matches!(
            FirebaseFeed::new(&BellConfig::default()),
            Err(FeedError::Url(_))
        ));
    }
}
