//! Per-document formatting settings
//!
//!     Settings resolution is explicit state owned by the server: a map from document URI to the
//!     resolved [`FormatSettings`]. Entries are added on first use, dropped when their document
//!     closes, and the whole map is dropped when the client reports a configuration change.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;
use tower_lsp::lsp_types::Url;
use tracing::warn;
use xml_format::FormatSettings;

/// Configuration section pulled from the client.
pub const SETTINGS_SECTION: &str = "xml.format";

#[derive(Debug, Default)]
pub struct SettingsCache {
    state: RwLock<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<Url, FormatSettings>,
    /// Bumped by every invalidation so that a resolution started before it is not stored.
    generation: u64,
}

impl SettingsCache {
    pub async fn get(&self, uri: &Url) -> Option<FormatSettings> {
        self.state.read().await.entries.get(uri).cloned()
    }

    /// Token to pass to [`SettingsCache::insert`] once settings have been resolved.
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Store `settings` unless the cache was invalidated after `generation` was taken.
    ///
    /// Returns whether the entry was stored.
    pub async fn insert(&self, uri: Url, settings: FormatSettings, generation: u64) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return false;
        }
        state.entries.insert(uri, settings);
        true
    }

    pub async fn invalidate(&self, uri: &Url) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.entries.remove(uri);
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.entries.clear();
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

/// Overlay the keys of a client settings object onto `base`.
///
/// Anything that is not a JSON object, or that fails to deserialize once merged, leaves `base`
/// unchanged.
pub fn merge_settings(base: &FormatSettings, overlay: Value) -> FormatSettings {
    let Value::Object(overlay) = overlay else {
        return base.clone();
    };
    let mut merged = match serde_json::to_value(base) {
        Ok(Value::Object(map)) => map,
        _ => return base.clone(),
    };
    merged.extend(overlay);
    match serde_json::from_value(Value::Object(merged)) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(%err, "ignoring invalid {SETTINGS_SECTION} settings");
            base.clone()
        }
    }
}
