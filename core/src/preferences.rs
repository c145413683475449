// UI preferences
//
// The theme is an explicit state object owned by the caller and handed to
// views by reference. Persistence is injected through `PreferenceStore`.

use crate::{AgisError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Persisted UI preferences
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub dark_mode: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn from_dark_mode(dark: bool) -> Self {
        if dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Load/save capability for preferences
#[cfg_attr(test, mockall::automock)]
pub trait PreferenceStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    fn load(&self) -> Result<Option<Preferences>>;

    fn save(&self, prefs: &Preferences) -> Result<()>;
}

/// Preferences kept as a JSON file
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFileStore {
    fn load(&self) -> Result<Option<Preferences>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path)?;
        let prefs = serde_json::from_slice(&data)?;
        Ok(Some(prefs))
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let data = serde_json::to_vec_pretty(prefs)?;
        fs::write(&self.path, data)?;
        debug!(target: "preferences", path = %self.path.display(), "Preferences saved");
        Ok(())
    }
}

/// In-process store (tests, ephemeral sessions)
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Option<Preferences>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(prefs: Preferences) -> Self {
        Self {
            inner: Mutex::new(Some(prefs)),
        }
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self) -> Result<Option<Preferences>> {
        let guard = self
            .inner
            .lock()
            .map_err(|e| AgisError::Preferences(e.to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| AgisError::Preferences(e.to_string()))?;
        *guard = Some(prefs.clone());
        Ok(())
    }
}

/// Theme state with injected persistence
pub struct ThemeStore {
    prefs: Preferences,
    store: Box<dyn PreferenceStore>,
}

impl ThemeStore {
    /// Initialise from the store; a missing or unreadable record yields the
    /// default (light) theme
    pub fn load(store: Box<dyn PreferenceStore>) -> Self {
        let prefs = match store.load() {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Preferences::default(),
            Err(e) => {
                warn!(target: "preferences", error = %e, "Failed to load preferences; using defaults");
                Preferences::default()
            }
        };
        info!(target: "preferences", dark_mode = prefs.dark_mode, "Preferences loaded");
        Self { prefs, store }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn theme(&self) -> Theme {
        Theme::from_dark_mode(self.prefs.dark_mode)
    }

    pub fn is_dark(&self) -> bool {
        self.prefs.dark_mode
    }

    /// Set dark mode and persist it. The in-memory value changes even when
    /// saving fails.
    pub fn set_dark(&mut self, dark: bool) -> Result<Theme> {
        self.prefs.dark_mode = dark;
        self.store.save(&self.prefs)?;
        Ok(self.theme())
    }

    pub fn toggle(&mut self) -> Result<Theme> {
        self.set_dark(!self.prefs.dark_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_uses_saved_value() {
        let mut store = MockPreferenceStore::new();
        store
            .expect_load()
            .times(1)
            .returning(|| Ok(Some(Preferences { dark_mode: true })));

        let theme = ThemeStore::load(Box::new(store));
        assert_eq!(theme.theme(), Theme::Dark);
    }

    #[test]
    fn test_load_failure_falls_back_to_light() {
        let mut store = MockPreferenceStore::new();
        store
            .expect_load()
            .returning(|| Err(AgisError::Preferences("corrupt".to_string())));

        let theme = ThemeStore::load(Box::new(store));
        assert_eq!(theme.theme(), Theme::Light);
        assert!(!theme.is_dark());
    }

    #[test]
    fn test_toggle_persists_new_value() {
        let mut store = MockPreferenceStore::new();
        store.expect_load().returning(|| Ok(None));
        store
            .expect_save()
            .withf(|p| p.dark_mode)
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_save()
            .withf(|p| !p.dark_mode)
            .times(1)
            .returning(|_| Ok(()));

        let mut theme = ThemeStore::load(Box::new(store));
        assert_eq!(theme.toggle().unwrap(), Theme::Dark);
        assert_eq!(theme.toggle().unwrap(), Theme::Light);
    }

    #[test]
    fn test_save_failure_is_reported_but_state_changes() {
        let mut store = MockPreferenceStore::new();
        store.expect_load().returning(|| Ok(None));
        store
            .expect_save()
            .returning(|_| Err(AgisError::Preferences("read-only".to_string())));

        let mut theme = ThemeStore::load(Box::new(store));
        assert!(theme.set_dark(true).is_err());
        assert!(theme.is_dark());
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&Preferences { dark_mode: true }).unwrap();
        assert_eq!(store.load().unwrap(), Some(Preferences { dark_mode: true }));
    }
}
