use chrono::{Local, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// How many records the admin feed keeps in view.
pub const FEED_LIMIT: usize = 50;

/// Feed path used by the admin panel.
pub const ADMIN_FEED_PATH: &str = "notifications/admin";

/// Notification type tag. Anything unrecognised decodes as `General`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    Booking,
    BookingNew,
    BookingCheckIn,
    BookingCheckOut,
    BookingExtend,
    Chat,
    Review,
    ReviewNew,
    #[default]
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Booking => "booking",
            NotificationKind::BookingNew => "booking_new",
            NotificationKind::BookingCheckIn => "booking_check_in",
            NotificationKind::BookingCheckOut => "booking_check_out",
            NotificationKind::BookingExtend => "booking_extend",
            NotificationKind::Chat => "chat",
            NotificationKind::Review => "review",
            NotificationKind::ReviewNew => "review_new",
            NotificationKind::General => "general",
        }
    }

    pub fn parse(tag: &str) -> Self {
        match tag {
            "booking" => NotificationKind::Booking,
            "booking_new" => NotificationKind::BookingNew,
            "booking_check_in" => NotificationKind::BookingCheckIn,
            "booking_check_out" => NotificationKind::BookingCheckOut,
            "booking_extend" => NotificationKind::BookingExtend,
            "chat" => NotificationKind::Chat,
            "review" => NotificationKind::Review,
            "review_new" => NotificationKind::ReviewNew,
            _ => NotificationKind::General,
        }
    }

    pub fn is_booking(&self) -> bool {
        matches!(
            self,
            NotificationKind::Booking
                | NotificationKind::BookingNew
                | NotificationKind::BookingCheckIn
                | NotificationKind::BookingCheckOut
                | NotificationKind::BookingExtend
        )
    }

    pub fn is_review(&self) -> bool {
        matches!(self, NotificationKind::Review | NotificationKind::ReviewNew)
    }
}

impl From<String> for NotificationKind {
    fn from(tag: String) -> Self {
        NotificationKind::parse(&tag)
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of the notification feed.
///
/// The store owns every field except `read`, which only ever flips to `true`.
/// `id` is the key the record lives under and is not part of the stored object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub read: bool,
    #[serde(rename = "type", default, deserialize_with = "lenient_kind")]
    pub kind: NotificationKind,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub booking_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub review_id: Option<String>,
}

impl NotificationRecord {
    /// Decodes the object stored under `id`.
    pub fn from_entry(id: &str, value: &Value) -> Result<Self, serde_json::Error> {
        let mut record = NotificationRecord::deserialize(value)?;
        record.id = id.to_string();
        Ok(record)
    }

    pub fn is_unread(&self) -> bool {
        !self.read
    }

    pub fn title_text(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// `body` wins over `message`; both absent gives an empty string.
    pub fn body_text(&self) -> &str {
        self.body
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("")
    }
}

// Stored documents are written by several producers, so ids show up as
// numbers, timestamps as floats and flags as null. Empty strings count as absent.
fn lenient_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(match v {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_kind<'de, D>(de: D) -> Result<NotificationKind, D::Error>
where
    D: Deserializer<'de>,
{
    // Anything that is not a known tag renders as a general notification.
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::String(s)) => NotificationKind::parse(&s),
        _ => NotificationKind::General,
    })
}

fn lenient_millis<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(matches!(v, Some(Value::Bool(true))))
}

/// A child that could not be decoded into a [`NotificationRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedSnapshot {
    /// Ascending by timestamp, ties broken by key.
    pub records: Vec<NotificationRecord>,
    pub rejected: Vec<RejectedRecord>,
}

/// Decodes a feed object (`{ id: record, ... }`) in feed order.
/// `null` and other non-object values decode as an empty snapshot.
pub fn decode_snapshot(value: &Value) -> DecodedSnapshot {
    let mut out = DecodedSnapshot::default();
    let Some(children) = value.as_object() else {
        return out;
    };

    for (id, child) in children {
        if !child.is_object() {
            out.rejected.push(RejectedRecord {
                id: id.clone(),
                reason: "not an object".to_string(),
            });
            continue;
        }
        match NotificationRecord::from_entry(id, child) {
            Ok(r) => out.records.push(r),
            Err(e) => out.rejected.push(RejectedRecord {
                id: id.clone(),
                reason: e.to_string(),
            }),
        }
    }

    sort_feed_order(&mut out.records);
    out
}

/// Feed order: timestamp ascending, records without one first, then by key.
pub fn sort_feed_order(records: &mut [NotificationRecord]) {
    records.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Keeps the `limit` most recent records of a feed-ordered list.
pub fn keep_latest(mut records: Vec<NotificationRecord>, limit: usize) -> Vec<NotificationRecord> {
    if records.len() > limit {
        let drop_n = records.len() - limit;
        records.drain(0..drop_n);
    }
    records
}

/// Display order is the feed order reversed.
pub fn newest_first(mut records: Vec<NotificationRecord>) -> Vec<NotificationRecord> {
    records.reverse();
    records
}

pub fn unread_count(records: &[NotificationRecord]) -> usize {
    records.iter().filter(|r| r.is_unread()).count()
}

/// Relative-path update applied atomically under one feed path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MultiPathUpdate(BTreeMap<String, Value>);

impl MultiPathUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{ "<id>/read": true, ... }` for every id.
    pub fn mark_read<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut update = Self::new();
        for id in ids {
            update.set(format!("{id}/read"), Value::Bool(true));
        }
        update
    }

    pub fn set(&mut self, path: impl Into<String>, value: Value) {
        self.0.insert(path.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect::<Map<String, Value>>())
    }
}

/// Local wall-clock label for an epoch-millis timestamp.
pub fn format_timestamp_ms_local(timestamp_ms: i64) -> String {
    format_timestamp_ms_in(timestamp_ms, &Local)
}

pub fn format_timestamp_ms_in<Tz>(timestamp_ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    tz.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%d/%m/%Y, %H:%M:%S").to_string())
        .unwrap_or_default()
}
