// frontend/src/notification_bell/config.rs
//
// Settings come from three layers, later ones win:
//   defaults -> persisted store -> environment (env vars on native, window globals on web)

use super::error::ConfigError;
use adminbell_shared::{ADMIN_FEED_PATH, FEED_LIMIT};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[cfg(target_arch = "wasm32")]
const SETTINGS_STORAGE_KEY: &str = "adminbell_settings";

pub const DEFAULT_SOUND_SRC: &str = "/admin/assets/sounds/notification.wav";
pub const DEFAULT_SCROLL_DELAY_MS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BellConfig {
    /// `scheme://host[:port]` of the realtime database, no trailing slash.
    pub database_url: String,
    pub auth_token: Option<String>,
    pub feed_path: String,
    pub feed_limit: usize,
    pub sound_src: String,
    pub scroll_delay_ms: u32,
}

impl Default for BellConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            auth_token: None,
            feed_path: ADMIN_FEED_PATH.to_string(),
            feed_limit: FEED_LIMIT,
            sound_src: DEFAULT_SOUND_SRC.to_string(),
            scroll_delay_ms: DEFAULT_SCROLL_DELAY_MS,
        }
    }
}

impl BellConfig {
    pub fn load() -> Self {
        let mut cfg = BellConfig::default();
        let stored = StoredSettings::load();
        cfg.apply_overrides(|key| stored.value(key));
        cfg.apply_overrides(environment_value);
        cfg
    }

    /// Applies every `ADMINBELL_*` key `lookup` knows about. Unparseable numbers
    /// are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("ADMINBELL_DATABASE_URL") {
            self.database_url = normalize_database_url(v);
        }
        if let Some(v) = lookup("ADMINBELL_AUTH_TOKEN") {
            let v = v.trim().to_string();
            self.auth_token = (!v.is_empty()).then_some(v);
        }
        if let Some(v) = lookup("ADMINBELL_FEED_PATH") {
            let v = normalize_feed_path(&v);
            if !v.is_empty() {
                self.feed_path = v;
            }
        }
        if let Some(v) = lookup("ADMINBELL_FEED_LIMIT") {
            match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.feed_limit = n,
                _ => warn!("ignoring ADMINBELL_FEED_LIMIT={v:?}"),
            }
        }
        if let Some(v) = lookup("ADMINBELL_SOUND_SRC") {
            if !v.trim().is_empty() {
                self.sound_src = v.trim().to_string();
            }
        }
        if let Some(v) = lookup("ADMINBELL_SCROLL_DELAY_MS") {
            match v.trim().parse::<u32>() {
                Ok(n) => self.scroll_delay_ms = n.min(5_000),
                Err(_) => warn!("ignoring ADMINBELL_SCROLL_DELAY_MS={v:?}"),
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if !(self.database_url.starts_with("http://") || self.database_url.starts_with("https://")) {
            return Err(ConfigError::BadScheme(self.database_url.clone()));
        }
        if self.feed_path.is_empty() {
            return Err(ConfigError::Invalid {
                key: "feed_path",
                reason: "empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn set_database_url_and_persist(url: String) -> String {
        let clean = normalize_database_url(url);
        StoredSettings::update(|s| s.database_url = Some(clean.clone()));
        clean
    }

    pub fn set_auth_token_and_persist(token: &str) {
        let token = token.trim().to_string();
        StoredSettings::update(|s| s.auth_token = (!token.is_empty()).then_some(token));
    }

    pub fn set_feed_path_and_persist(path: &str) {
        let path = normalize_feed_path(path);
        StoredSettings::update(|s| s.feed_path = (!path.is_empty()).then_some(path));
    }

    pub fn stored_database_url() -> Option<String> {
        StoredSettings::load()
            .database_url
            .map(normalize_database_url)
            .filter(|s| !s.is_empty())
    }
}

/// Keeps `scheme://host[:port]` and drops fragment, path and trailing slashes.
pub fn normalize_database_url(mut url: String) -> String {
    if let Some(idx) = url.find('#') {
        url.truncate(idx);
    }
    if let Some(idx) = url.find('?') {
        url.truncate(idx);
    }
    if let Some(scheme_end) = url.find("://") {
        let rest = &url[scheme_end + 3..];
        if let Some(slash) = rest.find('/') {
            url.truncate(scheme_end + 3 + slash);
        }
    }
    url.trim().trim_end_matches('/').to_string()
}

pub fn normalize_feed_path(path: &str) -> String {
    path.trim()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(not(target_arch = "wasm32"))]
fn environment_value(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// Host pages configure the web build through `window.__ADMINBELL_*` globals.
#[cfg(target_arch = "wasm32")]
fn environment_value(key: &str) -> Option<String> {
    let win = web_sys::window()?;
    let name = format!("__{key}");
    let v = js_sys::Reflect::get(&win, &wasm_bindgen::JsValue::from_str(&name)).ok()?;
    v.as_string().filter(|s| !s.trim().is_empty())
}

/// What the Connect screen saves. Stored as one JSON object: a localStorage
/// entry on web, `adminbell/settings.json` under the data dir on native.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct StoredSettings {
    database_url: Option<String>,
    auth_token: Option<String>,
    feed_path: Option<String>,
}

impl StoredSettings {
    fn value(&self, key: &str) -> Option<String> {
        let v = match key {
            "ADMINBELL_DATABASE_URL" => &self.database_url,
            "ADMINBELL_AUTH_TOKEN" => &self.auth_token,
            "ADMINBELL_FEED_PATH" => &self.feed_path,
            _ => return None,
        };
        v.clone().filter(|v| !v.trim().is_empty())
    }

    // A damaged store reads as empty so the Connect screen can overwrite it.
    fn decode(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!("ignoring unreadable settings: {e}");
            Self::default()
        })
    }

    fn load() -> Self {
        store::read().map(|raw| Self::decode(&raw)).unwrap_or_default()
    }

    fn update(edit: impl FnOnce(&mut Self)) {
        let mut settings = Self::load();
        edit(&mut settings);
        let result = serde_json::to_string_pretty(&settings)
            .map_err(|e| ConfigError::Store(e.to_string()))
            .and_then(|raw| store::write(&raw));
        if let Err(e) = result {
            warn!("failed to save settings: {e}");
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod store {
    use super::{ConfigError, SETTINGS_STORAGE_KEY};

    fn local_storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }

    pub(super) fn read() -> Option<String> {
        local_storage()?.get_item(SETTINGS_STORAGE_KEY).ok()?
    }

    pub(super) fn write(raw: &str) -> Result<(), ConfigError> {
        let ls = local_storage().ok_or_else(|| ConfigError::Store("localStorage unavailable".to_string()))?;
        ls.set_item(SETTINGS_STORAGE_KEY, raw)
            .map_err(|e| ConfigError::Store(format!("{e:?}")))
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod store {
    use super::ConfigError;
    use std::path::{Path, PathBuf};

    fn settings_path() -> Option<PathBuf> {
        let mut path = dirs::data_local_dir().or_else(dirs::data_dir)?;
        path.push("adminbell");
        path.push("settings.json");
        Some(path)
    }

    pub(super) fn read() -> Option<String> {
        read_from(&settings_path()?)
    }

    pub(super) fn write(raw: &str) -> Result<(), ConfigError> {
        let path = settings_path().ok_or_else(|| ConfigError::Store("no data directory".to_string()))?;
        write_to(&path, raw)
    }

    pub(super) fn read_from(path: &Path) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }

    pub(super) fn write_to(path: &Path, raw: &str) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Store(e.to_string()))?;
        }
        std::fs::write(path, raw).map_err(|e| ConfigError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_admin_feed() {
        let cfg = BellConfig::default();
        assert_eq!(cfg.feed_path, "notifications/admin");
        assert_eq!(cfg.feed_limit, 50);
        assert_eq!(cfg.scroll_delay_ms, 100);
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingDatabaseUrl)));
    }

    #[test]
    fn overrides_are_normalized() {
        let mut cfg = BellConfig::default();
        cfg.apply_overrides(lookup(&[
            ("ADMINBELL_DATABASE_URL", "https://demo-rtdb.example.com/some/page#frag"),
            ("ADMINBELL_FEED_PATH", "/notifications//staff/"),
            ("ADMINBELL_AUTH_TOKEN", "  "),
            ("ADMINBELL_FEED_LIMIT", "20"),
        ]));

        assert_eq!(cfg.database_url, "https://demo-rtdb.example.com");
        assert_eq!(cfg.feed_path, "notifications/staff");
        assert_eq!(cfg.auth_token, None);
        assert_eq!(cfg.feed_limit, 20);
        assert!(cfg.is_configured());
    }

    #[test]
    fn bad_numbers_keep_defaults() {
        let mut cfg = BellConfig::default();
        cfg.apply_overrides(lookup(&[
            ("ADMINBELL_FEED_LIMIT", "0"),
            ("ADMINBELL_SCROLL_DELAY_MS", "soon"),
        ]));
        assert_eq!(cfg.feed_limit, 50);
        assert_eq!(cfg.scroll_delay_ms, 100);
    }

    #[test]
    fn stored_settings_feed_the_persisted_layer() {
        let stored = StoredSettings::decode(
            r#"{ "database_url": "https://demo-rtdb.example.com/", "auth_token": " ", "extra": 1 }"#,
        );
        assert_eq!(stored.feed_path, None);

        let mut cfg = BellConfig::default();
        cfg.apply_overrides(|key| stored.value(key));
        assert_eq!(cfg.database_url, "https://demo-rtdb.example.com");
        assert_eq!(cfg.auth_token, None);
        assert_eq!(cfg.feed_path, "notifications/admin");
    }

    #[test]
    fn damaged_settings_read_as_empty() {
        assert_eq!(StoredSettings::decode("{not json"), StoredSettings::default());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn settings_file_is_created_on_write() {
        let dir = std::env::temp_dir().join(format!("adminbell-settings-{}", std::process::id()));
        let path = dir.join("nested").join("settings.json");
        assert_eq!(store::read_from(&path), None);

        let settings = StoredSettings {
            feed_path: Some("notifications/staff".to_string()),
            ..Default::default()
        };
        let raw = serde_json::to_string(&settings).unwrap();
        store::write_to(&path, &raw).unwrap();

        let back = StoredSettings::decode(&store::read_from(&path).unwrap());
        assert_eq!(back.value("ADMINBELL_FEED_PATH").as_deref(), Some("notifications/staff"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn scheme_is_required() {
        let mut cfg = BellConfig::default();
        cfg.database_url = normalize_database_url("demo.example.com".to_string());
        assert!(matches!(cfg.validate(), Err(ConfigError::BadScheme(_))));
    }
}
