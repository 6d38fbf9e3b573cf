//! Set of alert ids the user chose to hide

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::KeyValueStore;

/// Storage key of the persisted dismissed-alert ids
pub const DISMISSED_ALERTS_KEY: &str = "dismissedWeatherAlerts";

/// Dismissed alert ids, shared between clones
///
/// Lives for the whole process. When built with [`DismissedAlerts::persistent`]
/// every change is also written to the store as a JSON array of ids.
#[derive(Clone, Default)]
pub struct DismissedAlerts {
    ids: Arc<Mutex<HashSet<String>>>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl std::fmt::Debug for DismissedAlerts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DismissedAlerts")
            .field("ids", &*self.ids.lock())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl DismissedAlerts {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads previously dismissed ids; unreadable data starts an empty set
    pub fn persistent(store: Arc<dyn KeyValueStore>) -> Self {
        let ids = match store.get(DISMISSED_ALERTS_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<String>>(&raw)
                .map(|ids| ids.into_iter().collect())
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Failed to load dismissed alerts from storage");
                    HashSet::new()
                }),
            Ok(None) => HashSet::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load dismissed alerts from storage");
                HashSet::new()
            }
        };

        Self {
            ids: Arc::new(Mutex::new(ids)),
            store: Some(store),
        }
    }

    pub fn dismiss(&self, id: &str) {
        let snapshot = {
            let mut ids = self.ids.lock();
            if !ids.insert(id.to_string()) {
                return;
            }
            let mut sorted: Vec<String> = ids.iter().cloned().collect();
            sorted.sort();
            sorted
        };
        self.save(&snapshot);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }

    fn save(&self, ids: &[String]) {
        let Some(store) = &self.store else {
            return;
        };
        let result = serde_json::to_string(ids)
            .map_err(std::io::Error::other)
            .and_then(|json| store.set(DISMISSED_ALERTS_KEY, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to save dismissed alerts to storage");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    #[test]
    fn test_dismiss_is_shared_between_clones() {
        let dismissed = DismissedAlerts::in_memory();
        let other = dismissed.clone();

        dismissed.dismiss("alert-1");

        assert!(other.contains("alert-1"));
        assert!(!other.contains("alert-2"));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn test_dismiss_twice_keeps_one_entry() {
        let dismissed = DismissedAlerts::in_memory();
        dismissed.dismiss("a");
        dismissed.dismiss("a");
        assert_eq!(dismissed.len(), 1);
    }

    #[test]
    fn test_persistent_set_survives_reload() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let first = DismissedAlerts::persistent(store.clone());
        first.dismiss("b");
        first.dismiss("a");
        assert_eq!(
            store.get(DISMISSED_ALERTS_KEY).unwrap().as_deref(),
            Some(r#"["a","b"]"#)
        );

        let reloaded = DismissedAlerts::persistent(store);
        assert!(reloaded.contains("a"));
        assert!(reloaded.contains("b"));
    }

    #[test]
    fn test_corrupt_storage_starts_empty() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(DISMISSED_ALERTS_KEY, "not json").unwrap();

        let dismissed = DismissedAlerts::persistent(store);
        assert!(dismissed.is_empty());
    }
}
