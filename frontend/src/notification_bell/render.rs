// frontend/src/notification_bell/render.rs
//
// Snapshot -> view model. Nothing in here touches the DOM, so the whole render
// path runs in plain unit tests.

use adminbell_shared::{format_timestamp_ms_local, unread_count, NotificationKind, NotificationRecord};

pub const EMPTY_PLACEHOLDER: &str = "No notifications.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Hidden,
    Count(usize),
}

impl Badge {
    pub fn for_unread(count: usize) -> Self {
        if count == 0 {
            Badge::Hidden
        } else {
            Badge::Count(count)
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, Badge::Count(_))
    }

    pub fn text(&self) -> String {
        match self {
            Badge::Hidden => String::new(),
            Badge::Count(n) => n.to_string(),
        }
    }
}

/// One list row. Absent identifiers are empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRow {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub time_label: String,
    pub unread: bool,
    pub booking_id: String,
    pub user_id: String,
    pub location_id: String,
    pub review_id: String,
}

impl NotificationRow {
    pub fn from_record(r: &NotificationRecord) -> Self {
        let owned = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            id: r.id.clone(),
            kind: r.kind,
            title: r.title_text().to_string(),
            body: r.body_text().to_string(),
            time_label: r.timestamp.map(format_timestamp_ms_local).unwrap_or_default(),
            unread: r.is_unread(),
            booking_id: owned(&r.booking_id),
            user_id: owned(&r.user_id),
            location_id: owned(&r.location_id),
            review_id: owned(&r.review_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListView {
    Empty(&'static str),
    Rows(Vec<NotificationRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BellView {
    pub badge: Badge,
    pub list: ListView,
    pub popup_open: bool,
}

impl Default for BellView {
    fn default() -> Self {
        Self {
            badge: Badge::Hidden,
            list: ListView::Empty(EMPTY_PLACEHOLDER),
            popup_open: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOutcome {
    pub unread_count: usize,
    pub play_sound: bool,
}

/// Per-widget render state. `last_unread` lives here rather than in a global so
/// two bells never share it.
#[derive(Debug, Default)]
pub struct BellState {
    rows: Vec<NotificationRow>,
    last_unread: usize,
    popup_open: bool,
}

impl BellState {
    /// Replaces the rows with `records` (already newest first).
    pub fn apply_snapshot(&mut self, records: &[NotificationRecord], has_interacted: bool) -> RenderOutcome {
        self.rows = records.iter().map(NotificationRow::from_record).collect();

        let count = unread_count(records);
        let play_sound = count > self.last_unread && has_interacted;
        self.last_unread = count;

        RenderOutcome {
            unread_count: count,
            play_sound,
        }
    }

    pub fn view(&self) -> BellView {
        let unread = self.rows.iter().filter(|r| r.unread).count();
        BellView {
            badge: Badge::for_unread(unread),
            list: if self.rows.is_empty() {
                ListView::Empty(EMPTY_PLACEHOLDER)
            } else {
                ListView::Rows(self.rows.clone())
            },
            popup_open: self.popup_open,
        }
    }

    pub fn row(&self, id: &str) -> Option<&NotificationRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn last_unread(&self) -> usize {
        self.last_unread
    }

    /// Clears the unread highlight of one row. Returns whether it was unread.
    ///
    /// The badge follows the rows, so it drops right away too; `last_unread`
    /// is left for the next snapshot to settle.
    pub fn strip_highlight(&mut self, id: &str) -> bool {
        match self.rows.iter_mut().find(|r| r.id == id) {
            Some(row) if row.unread => {
                row.unread = false;
                true
            }
            _ => false,
        }
    }

    /// Returns the new visibility.
    pub fn toggle_popup(&mut self) -> bool {
        self.popup_open = !self.popup_open;
        self.popup_open
    }

    /// Returns whether the popup was open.
    pub fn close_popup(&mut self) -> bool {
        std::mem::replace(&mut self.popup_open, false)
    }

    pub fn popup_open(&self) -> bool {
        self.popup_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, read: bool) -> NotificationRecord {
        NotificationRecord {
            id: id.to_string(),
            read,
            timestamp: Some(1_700_000_000_000),
            title: Some(format!("title {id}")),
            message: Some("from message".to_string()),
            ..Default::default()
        }
    }

    fn unread(n: usize) -> Vec<NotificationRecord> {
        (0..n).map(|i| rec(&format!("n{i}"), false)).collect()
    }

    #[test]
    fn empty_snapshot_shows_placeholder_and_hides_badge() {
        let mut st = BellState::default();
        st.apply_snapshot(&[], true);
        let v = st.view();
        assert_eq!(v.badge, Badge::Hidden);
        assert!(!v.badge.is_visible());
        assert_eq!(v.list, ListView::Empty("No notifications."));
    }

    #[test]
    fn badge_counts_unread_rows() {
        let mut st = BellState::default();
        let snap = vec![rec("a", false), rec("b", true), rec("c", false)];
        let out = st.apply_snapshot(&snap, false);

        assert_eq!(out.unread_count, 2);
        assert_eq!(st.view().badge, Badge::Count(2));
        assert_eq!(st.view().badge.text(), "2");

        st.apply_snapshot(&[rec("a", true)], false);
        assert_eq!(st.view().badge, Badge::Hidden);
    }

    #[test]
    fn same_snapshot_twice_plays_once() {
        let mut st = BellState::default();
        let snap = unread(3);
        assert!(st.apply_snapshot(&snap, true).play_sound);
        assert!(!st.apply_snapshot(&snap, true).play_sound);
    }

    #[test]
    fn rise_plays_only_after_interaction() {
        let mut st = BellState::default();
        st.apply_snapshot(&unread(2), true);
        assert!(st.apply_snapshot(&unread(5), true).play_sound);

        let mut quiet = BellState::default();
        quiet.apply_snapshot(&unread(2), false);
        assert!(!quiet.apply_snapshot(&unread(5), false).play_sound);
        // still tracked, so a later interaction does not replay old items
        assert_eq!(quiet.last_unread(), 5);
        assert!(!quiet.apply_snapshot(&unread(5), true).play_sound);
    }

    #[test]
    fn rows_carry_identifiers_and_fallback_body() {
        let mut r = rec("x", false);
        r.booking_id = Some("B1".to_string());
        let row = NotificationRow::from_record(&r);

        assert_eq!(row.body, "from message");
        assert_eq!(row.booking_id, "B1");
        assert_eq!(row.user_id, "");
        assert!(!row.time_label.is_empty());
    }

    #[test]
    fn strip_highlight_only_once() {
        let mut st = BellState::default();
        st.apply_snapshot(&unread(2), false);
        assert!(st.strip_highlight("n0"));
        assert!(!st.strip_highlight("n0"));
        assert!(!st.strip_highlight("missing"));
        assert!(st.row("n1").is_some_and(|r| r.unread));
        assert_eq!(st.view().badge, Badge::Count(1));
    }

    #[test]
    fn popup_toggle_and_close() {
        let mut st = BellState::default();
        assert!(st.toggle_popup());
        assert!(st.close_popup());
        assert!(!st.close_popup());
        assert!(!st.view().popup_open);
    }
}
