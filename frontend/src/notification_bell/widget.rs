// frontend/src/notification_bell/widget.rs
//
// Headless bell controller. Owns the render state, the single live query and
// every read-state mutation; the Dioxus component only forwards events and
// draws whatever view the registered listeners receive.
//
// Lifecycle:
//   attach()  -> anchors checked, nothing subscribed yet
//   run()     -> live query + reconnect supervisor, until detach()
//   detach()  -> live query dropped, listeners cleared

use super::anchors::{locate, AnchorLookup, LocatedAnchors, WidgetAnchors};
use super::config::BellConfig;
use super::dialog::DialogPresenter;
use super::dispatch::{dispatch_click, AdminHooks, Dispatch};
use super::error::{FeedError, WidgetError};
use super::feed::{NotificationFeed, SnapshotStream};
use super::render::{BellState, BellView};
use super::sleep_ms;
use super::sound::SoundPlayer;
use adminbell_shared::{newest_first, MultiPathUpdate, NotificationRecord};
use futures_util::stream::{AbortHandle, Abortable};
use futures_util::StreamExt;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

const RECONNECT_DELAY_MS: u32 = 800;

/// Everything the widget calls out to.
#[derive(Clone)]
pub struct WidgetDeps {
    pub feed: Rc<dyn NotificationFeed>,
    pub hooks: AdminHooks,
    pub dialogs: Rc<dyn DialogPresenter>,
    pub sound: Rc<dyn SoundPlayer>,
    /// Page-level "user has interacted" flag; sound stays off until it is set.
    pub has_interacted: Rc<dyn Fn() -> bool>,
}

pub type ViewListener = Rc<dyn Fn(&BellView)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

pub struct NotificationWidget {
    deps: WidgetDeps,
    anchors: LocatedAnchors,
    feed_limit: usize,
    scroll_delay_ms: u32,

    state: RefCell<BellState>,
    listeners: RefCell<Vec<(ListenerId, ViewListener)>>,
    next_listener: Cell<u64>,

    alive: Cell<bool>,
    subscribed: Cell<bool>,
    live: RefCell<Option<AbortHandle>>,
}

impl NotificationWidget {
    /// Checks the anchors and builds the widget. A missing required anchor
    /// disables the bell: the reason is logged and `None` comes back.
    pub async fn attach(
        anchors: &WidgetAnchors,
        lookup: &dyn AnchorLookup,
        config: &BellConfig,
        deps: WidgetDeps,
    ) -> Option<Rc<Self>> {
        let located = match locate(anchors, lookup).await {
            Ok(l) => l,
            Err(e) => {
                warn!("[BELL] disabled: {e}");
                return None;
            }
        };

        info!(
            "[BELL] attached (limit={}, mark_all={})",
            config.feed_limit, located.mark_all_present
        );

        Some(Rc::new(Self {
            deps,
            anchors: located,
            feed_limit: config.feed_limit,
            scroll_delay_ms: config.scroll_delay_ms,
            state: RefCell::new(BellState::default()),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            alive: Cell::new(true),
            subscribed: Cell::new(false),
            live: RefCell::new(None),
        }))
    }

    pub fn register_listener(&self, listener: impl Fn(&BellView) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn view(&self) -> BellView {
        self.state.borrow().view()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    pub fn has_mark_all_button(&self) -> bool {
        self.anchors.mark_all_present
    }

    pub fn anchors(&self) -> &WidgetAnchors {
        &self.anchors.anchors
    }

    pub fn scroll_delay_ms(&self) -> u32 {
        self.scroll_delay_ms
    }

    /// Stops delivery for good: the live query is dropped and listeners are
    /// cleared. Safe to call more than once.
    pub fn detach(&self) {
        if !self.alive.replace(false) {
            return;
        }
        if let Some(handle) = self.live.borrow_mut().take() {
            handle.abort();
        }
        self.listeners.borrow_mut().clear();
        info!("[BELL] detached");
    }

    /// Holds the live query open until [`detach`](Self::detach), resubscribing
    /// after a short pause whenever the feed drops it. Only one run per widget.
    pub async fn run(self: Rc<Self>) -> Result<(), WidgetError> {
        if self.subscribed.replace(true) {
            warn!("[BELL] live query already running; ignoring second start");
            return Err(WidgetError::AlreadySubscribed);
        }

        while self.is_alive() {
            let stream = self.deps.feed.subscribe_latest(self.feed_limit);
            match self.pump(stream).await {
                Ok(()) => {}
                Err(e) if self.is_alive() => warn!("[FEED] live query ended: {e}"),
                Err(_) => {}
            }

            if !self.is_alive() {
                break;
            }
            sleep_ms(RECONNECT_DELAY_MS).await;
        }

        debug!("[BELL] live query stopped");
        Ok(())
    }

    /// Feeds one subscription into the widget until it ends or the widget is
    /// detached. `Ok` means detached, anything else is worth a reconnect.
    pub async fn pump(&self, stream: SnapshotStream) -> Result<(), FeedError> {
        let (handle, registration) = AbortHandle::new_pair();
        *self.live.borrow_mut() = Some(handle);
        let mut stream = Abortable::new(stream, registration);

        while let Some(item) = stream.next().await {
            if !self.is_alive() {
                return Ok(());
            }
            self.on_snapshot(item?).await;
        }

        if self.is_alive() {
            Err(FeedError::Closed)
        } else {
            Ok(())
        }
    }

    /// Re-renders from a feed-ordered snapshot and plays the sound when the
    /// unread count went up.
    pub async fn on_snapshot(&self, records: Vec<NotificationRecord>) {
        let display = newest_first(records);
        let interacted = (self.deps.has_interacted)();
        let outcome = self.state.borrow_mut().apply_snapshot(&display, interacted);
        self.notify();

        if outcome.play_sound
            && let Err(e) = self.deps.sound.play().await
        {
            warn!("notification sound failed: {e}");
        }
    }

    /// Returns the new visibility. Opening marks everything on screen as read.
    pub async fn toggle_popup(&self) -> Result<bool, WidgetError> {
        let open = self.state.borrow_mut().toggle_popup();
        self.notify();
        if open {
            self.mark_visible_as_read().await?;
        }
        Ok(open)
    }

    /// Click somewhere on the page. Returns whether the popup closed.
    pub fn on_outside_click(&self, inside_popup: bool, on_bell: bool) -> bool {
        if inside_popup || on_bell {
            return false;
        }
        let closed = self.state.borrow_mut().close_popup();
        if closed {
            self.notify();
        }
        closed
    }

    /// Marks every unread record in the feed as read in one write, including
    /// those older than the rendered rows. Returns how many were marked; nothing
    /// is written when there are none.
    pub async fn mark_visible_as_read(&self) -> Result<usize, WidgetError> {
        let unread = self
            .deps
            .feed
            .query_equal("read", Value::Bool(false))
            .await?;
        if unread.is_empty() {
            return Ok(0);
        }
        let update = MultiPathUpdate::mark_read(unread.iter().map(|r| r.id.as_str()));
        self.deps.feed.update_many(&update).await?;
        Ok(update.len())
    }

    /// Marks every unread record in the feed as read, not just the visible
    /// ones, then closes the popup. The popup stays open on failure.
    pub async fn mark_all_as_read(&self) -> Result<usize, WidgetError> {
        let unread = self
            .deps
            .feed
            .query_equal("read", Value::Bool(false))
            .await?;
        let update = MultiPathUpdate::mark_read(unread.iter().map(|r| r.id.as_str()));
        self.deps.feed.update_many(&update).await?;

        if self.state.borrow_mut().close_popup() {
            self.notify();
        }
        info!("[BELL] marked {} notifications as read", update.len());
        Ok(update.len())
    }

    /// Marks the row read (highlight first, write second) and hands it to the
    /// matching admin action. A failed write is logged; the next snapshot
    /// brings the row back in line.
    pub async fn on_row_click(&self, id: &str) -> Option<Dispatch> {
        let Some(row) = self.state.borrow().row(id).cloned() else {
            warn!("[BELL] click on unknown notification {id}");
            return None;
        };

        if row.unread {
            self.state.borrow_mut().strip_highlight(id);
            self.notify();
            if let Err(e) = self
                .deps
                .feed
                .update_field(id, "read", Value::Bool(true))
                .await
            {
                warn!("failed to mark {id} as read: {e}");
            }
        }

        Some(dispatch_click(&row, &self.deps.hooks, self.deps.dialogs.as_ref()))
    }

    fn notify(&self) {
        let view = self.view();
        let listeners: Vec<ViewListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for l in listeners {
            l(&view);
        }
    }
}
