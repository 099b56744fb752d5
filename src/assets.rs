use std::{collections::HashMap, sync::Arc, sync::mpsc};

use tracing::{debug, warn};

use crate::catalog::SceneId;
use crate::notify::Notifier;

/// Generated illustration and narration for one scene.
///
/// Settled entries are either ready (both payloads present) or failed (an
/// error message and no payload). A loading entry never carries an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedAsset {
    pub image_url: Option<String>,
    pub audio: Option<Arc<Vec<u8>>>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Loading,
    Ready,
    Failed,
}

impl GeneratedAsset {
    pub fn loading() -> Self {
        GeneratedAsset {
            loading: true,
            ..Default::default()
        }
    }

    pub fn ready(image_url: String, audio: Vec<u8>) -> Self {
        GeneratedAsset {
            image_url: Some(image_url),
            audio: Some(Arc::new(audio)),
            loading: false,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        GeneratedAsset {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn status(&self) -> AssetStatus {
        if self.loading {
            AssetStatus::Loading
        } else if self.error.is_none() && self.image_url.is_some() && self.audio.is_some() {
            AssetStatus::Ready
        } else {
            AssetStatus::Failed
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == AssetStatus::Ready
    }
}

/// Partial update merged onto an existing entry. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct AssetPatch {
    pub image_url: Option<String>,
    pub audio: Option<Arc<Vec<u8>>>,
    pub loading: Option<bool>,
    pub error: Option<String>,
}

impl AssetPatch {
    pub fn loading() -> Self {
        AssetPatch {
            loading: Some(true),
            ..Default::default()
        }
    }
}

fn normalize(mut asset: GeneratedAsset) -> GeneratedAsset {
    if asset.loading {
        asset.error = None;
        return asset;
    }
    if asset.error.is_some() {
        asset.image_url = None;
        asset.audio = None;
        return asset;
    }
    match (&asset.image_url, &asset.audio) {
        (Some(_), Some(_)) => asset,
        (Some(_), None) => GeneratedAsset::failed("incomplete asset: narration missing"),
        (None, Some(_)) => GeneratedAsset::failed("incomplete asset: image missing"),
        (None, None) => GeneratedAsset::failed("asset has no content"),
    }
}

/// In-memory scene id → asset map for the session. Every effective change
/// is announced to subscribers with the affected scene id.
#[derive(Default)]
pub struct AssetCache {
    entries: HashMap<SceneId, GeneratedAsset>,
    notifier: Notifier<SceneId>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SceneId) -> Option<&GeneratedAsset> {
        self.entries.get(&id)
    }

    pub fn status(&self, id: SceneId) -> Option<AssetStatus> {
        self.get(id).map(GeneratedAsset::status)
    }

    /// Replace the entry for `id`. Returns whether anything changed.
    pub fn set(&mut self, id: SceneId, asset: GeneratedAsset) -> bool {
        let asset = normalize(asset);
        if self.entries.get(&id) == Some(&asset) {
            return false;
        }
        debug!(scene = id, status = ?asset.status(), "asset entry replaced");
        self.entries.insert(id, asset);
        self.notifier.notify(id);
        true
    }

    /// Shallow-merge `patch` onto the entry for `id` (or an empty entry).
    /// Ready entries are immutable here; replacing one needs `set`.
    pub fn merge(&mut self, id: SceneId, patch: AssetPatch) -> bool {
        let current = self.entries.get(&id).cloned().unwrap_or_default();
        if current.is_ready() {
            warn!(scene = id, "ignoring merge onto a ready asset");
            return false;
        }
        let merged = GeneratedAsset {
            image_url: patch.image_url.or(current.image_url),
            audio: patch.audio.or(current.audio),
            loading: patch.loading.unwrap_or(current.loading),
            error: patch.error.or(current.error),
        };
        self.set(id, merged)
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<SceneId> {
        self.notifier.subscribe()
    }

    pub fn completed_count(&self) -> usize {
        self.entries.values().filter(|a| a.is_ready()).count()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_merge_clears_error() {
        let mut cache = AssetCache::new();
        cache.set(3, GeneratedAsset::failed("boom"));
        cache.merge(3, AssetPatch::loading());
        let entry = cache.get(3).unwrap();
        assert!(entry.loading);
        assert_eq!(entry.error, None);
        assert_eq!(entry.status(), AssetStatus::Loading);
    }

    #[test]
    fn error_entries_drop_payload() {
        let mut cache = AssetCache::new();
        cache.set(
            1,
            GeneratedAsset {
                image_url: Some("data:image/png;base64,AA==".into()),
                audio: None,
                loading: false,
                error: Some("narration failed".into()),
            },
        );
        let entry = cache.get(1).unwrap();
        assert_eq!(entry.image_url, None);
        assert_eq!(entry.status(), AssetStatus::Failed);
    }

    #[test]
    fn half_populated_entry_becomes_error() {
        let mut cache = AssetCache::new();
        cache.set(
            2,
            GeneratedAsset {
                image_url: Some("https://example.com/a.png".into()),
                ..Default::default()
            },
        );
        let entry = cache.get(2).unwrap();
        assert_eq!(entry.image_url, None);
        assert!(entry.error.as_deref().unwrap().contains("narration"));
    }

    #[test]
    fn ready_entry_is_immutable_through_merge() {
        let mut cache = AssetCache::new();
        cache.set(4, GeneratedAsset::ready("https://example.com/x.png".into(), vec![0, 0]));
        let changed = cache.merge(
            4,
            AssetPatch {
                image_url: Some("https://example.com/other.png".into()),
                ..AssetPatch::loading()
            },
        );
        assert!(!changed);
        let entry = cache.get(4).unwrap();
        assert_eq!(entry.image_url.as_deref(), Some("https://example.com/x.png"));
        assert!(entry.is_ready());
    }

    #[test]
    fn subscribers_see_effective_changes_only() {
        let mut cache = AssetCache::new();
        let rx = cache.subscribe();
        cache.set(5, GeneratedAsset::loading());
        cache.set(5, GeneratedAsset::loading());
        cache.set(5, GeneratedAsset::failed("nope"));
        let seen: Vec<SceneId> = rx.try_iter().collect();
        assert_eq!(seen, vec![5, 5]);
    }

    #[test]
    fn completed_count_tracks_ready_entries() {
        let mut cache = AssetCache::new();
        cache.set(1, GeneratedAsset::ready("u".into(), vec![1, 2]));
        cache.set(2, GeneratedAsset::loading());
        cache.set(3, GeneratedAsset::failed("x"));
        assert_eq!(cache.completed_count(), 1);
        assert_eq!(cache.len(), 3);
    }
}
