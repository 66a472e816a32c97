use thiserror::Error;

/// Failures talking to the realtime database.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid feed url: {0}")]
    Url(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("bad payload: {0}")]
    Decode(String),

    /// The server closed the live stream (`cancel` / `auth_revoked`).
    #[error("stream cancelled by server: {0}")]
    Cancelled(String),

    #[error("stream closed")]
    Closed,
}

impl FeedError {
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for FeedError {
    fn from(err: url::ParseError) -> Self {
        FeedError::Url(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SoundError {
    /// Usually the autoplay policy refusing playback.
    #[error("playback rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("required anchor #{0} not found")]
    MissingAnchor(String),

    #[error("widget already subscribed")]
    AlreadySubscribed,

    #[error(transparent)]
    Feed(#[from] FeedError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("database url is not configured")]
    MissingDatabaseUrl,

    #[error("database url must start with http:// or https://: {0}")]
    BadScheme(String),

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("settings store: {0}")]
    Store(String),
}
