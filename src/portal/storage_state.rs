use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::SessionError;

/// Storage-state snapshot: cookies plus per-origin localStorage, in the
/// same JSON shape browser tooling exports. Read wholesale, written
/// wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub origins: Vec<OriginState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, rename = "sameSite", skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginState {
    pub origin: String,
    #[serde(default, rename = "localStorage")]
    pub local_storage: Vec<StorageItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageItem {
    pub name: String,
    pub value: String,
}

/// Loads and saves the snapshot at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn size_bytes(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    pub fn load(&self) -> Result<StorageState, SessionError> {
        if !self.path.exists() {
            return Err(SessionError::SessionUnavailable(format!(
                "no storage state at {}",
                self.path.display()
            )));
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            SessionError::SessionUnavailable(format!(
                "storage state unreadable at {}: {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            SessionError::SessionUnavailable(format!(
                "storage state corrupt at {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    pub fn save(&self, state: &StorageState) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_exported_snapshot_shape() {
        let raw = r#"{
            "cookies": [
                {
                    "name": "sid",
                    "value": "abc123",
                    "domain": ".e-distribuzione.it",
                    "path": "/",
                    "expires": 1761000000.5,
                    "httpOnly": true,
                    "secure": true,
                    "sameSite": "Lax"
                }
            ],
            "origins": [
                {
                    "origin": "https://private.e-distribuzione.it",
                    "localStorage": [
                        { "name": "lang", "value": "it" }
                    ]
                }
            ]
        }"#;

        let state: StorageState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.cookies.len(), 1);
        assert!(state.cookies[0].http_only);
        assert_eq!(state.origins[0].local_storage[0].name, "lang");

        // camelCase keys survive a round trip
        let back = serde_json::to_string(&state).unwrap();
        assert!(back.contains("httpOnly"));
        assert!(back.contains("localStorage"));
    }

    #[test]
    fn test_missing_fields_default() {
        let state: StorageState =
            serde_json::from_str(r#"{"cookies":[{"name":"a","value":"b"}]}"#).unwrap();
        assert_eq!(state.cookies[0].path, "/");
        assert!(!state.cookies[0].secure);
        assert!(state.origins.is_empty());
    }

    #[test]
    fn test_load_missing_is_session_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("absent.json"));
        assert!(!store.exists());
        match store.load() {
            Err(SessionError::SessionUnavailable(_)) => {}
            other => panic!("expected SessionUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut state = StorageState::default();
        state.cookies.push(StoredCookie {
            name: "sid".to_string(),
            value: "v".to_string(),
            domain: "private.e-distribuzione.it".to_string(),
            path: "/".to_string(),
            expires: None,
            http_only: false,
            secure: true,
            same_site: None,
        });

        store.save(&state).unwrap();
        assert!(store.exists());
        assert!(store.size_bytes() > 0);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.cookies.len(), 1);
        assert_eq!(loaded.cookies[0].name, "sid");
    }
}
