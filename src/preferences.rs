//! Persisted user preferences: the API key and the preferred model.
//!
//! Stored as a small JSON object at
//! `<config_dir>/lazyq/preferences.json` (e.g. `~/.config/lazyq/` on Linux,
//! `~/Library/Application Support/lazyq/` on macOS). Set `LAZYQ_CONFIG_DIR`
//! to use a different directory.

use crate::config::{ProviderCredential, DEFAULT_MODEL};
use crate::error::QuizError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the preferences directory.
pub const CONFIG_DIR_ENV: &str = "LAZYQ_CONFIG_DIR";

const FILE_NAME: &str = "preferences.json";

/// Step-by-step guide to obtaining an OpenRouter API key.
///
/// Shown by `lazyq setup --guide` and the shell's `guide` command.
pub const API_KEY_GUIDE: &str = "\
GUIDA: Come ottenere la chiave API di OpenRouter

1. VAI SU OPENROUTER
   • Apri il browser e vai su: https://openrouter.ai

2. CREA UN ACCOUNT
   • Clicca su \"Sign In\" in alto a destra
   • Scegli tra Google, GitHub o Email
   • Completa la registrazione

3. AGGIUNGI CREDITI
   • Una volta entrato, apri \"Credits\" nel menu
   • Clicca su \"Add Credits\" e scegli l'importo (minimo $5)
   • Completa il pagamento
   • I crediti pagano le richieste al modello

4. CREA UNA CHIAVE API
   • Apri \"Keys\" nel menu
   • Clicca su \"Create Key\" e dai un nome alla chiave
   • Facoltativo: imposta un limite di spesa
   • La chiave inizia con \"sk-or-v1-...\"

5. COPIA E INCOLLA
   • Copia la chiave (viene mostrata una sola volta)
   • Salvala con `lazyq setup` oppure con `key <chiave>` nella shell

NOTA: la chiave API è come una password. Non condividerla.
Il modello predefinito è openai/gpt-4o, ma puoi cambiarlo.";

/// Values kept between runs. Unknown keys in the file are ignored.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(rename = "openrouter_api_key", default)]
    pub api_key: String,
    #[serde(rename = "openrouter_model", default)]
    pub model: String,
}

impl fmt::Debug for Preferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preferences")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .finish()
    }
}

impl Preferences {
    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Model to pre-fill: the stored one, or [`DEFAULT_MODEL`].
    pub fn model_or_default(&self) -> &str {
        match self.model.trim() {
            "" => DEFAULT_MODEL,
            m => m,
        }
    }

    pub fn credential(&self) -> ProviderCredential {
        ProviderCredential::new(&self.api_key, &self.model)
    }
}

impl From<&ProviderCredential> for Preferences {
    fn from(c: &ProviderCredential) -> Self {
        Self {
            api_key: c.api_key.clone(),
            model: c.model.clone(),
        }
    }
}

/// Reads and writes [`Preferences`] at a fixed path.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    /// Store backed by `<dir>/preferences.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(FILE_NAME),
        }
    }

    /// Store at the platform location, honouring [`CONFIG_DIR_ENV`].
    pub fn default_location() -> Self {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            if !dir.trim().is_empty() {
                return Self::in_dir(dir);
            }
        }
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(std::env::temp_dir);
        Self::in_dir(base.join("lazyq"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences. A missing file yields empty preferences.
    pub fn load(&self) -> Result<Preferences, QuizError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preferences at {}", self.path.display());
                return Ok(Preferences::default());
            }
            Err(e) => return Err(self.error(e)),
        };
        serde_json::from_str(&raw).map_err(|e| self.error(e))
    }

    /// Write preferences via a temporary file and rename.
    pub fn save(&self, prefs: &Preferences) -> Result<(), QuizError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }
        let json = serde_json::to_string_pretty(prefs).map_err(|e| self.error(e))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.error(e))?;
        restrict_permissions(&tmp);
        std::fs::rename(&tmp, &self.path).map_err(|e| self.error(e))?;
        info!("Saved preferences to {}", self.path.display());
        Ok(())
    }

    /// Persist the key and model of `credential`.
    pub fn save_credential(&self, credential: &ProviderCredential) -> Result<(), QuizError> {
        self.save(&Preferences::from(credential))
    }

    /// Update only the model, keeping the stored key.
    pub fn save_model(&self, model: &str) -> Result<(), QuizError> {
        let mut prefs = self.load()?;
        prefs.model = model.trim().to_string();
        self.save(&prefs)
    }

    fn error(&self, e: impl fmt::Display) -> QuizError {
        QuizError::Preferences {
            path: self.path.clone(),
            detail: e.to_string(),
        }
    }
}

// The file holds a bearer token.
#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_guide_points_to_openrouter() {
        assert!(API_KEY_GUIDE.contains("https://openrouter.ai"));
        assert!(API_KEY_GUIDE.contains("sk-or-v1-"));
        assert!(API_KEY_GUIDE.contains(DEFAULT_MODEL));
        assert!(API_KEY_GUIDE.contains("lazyq setup"));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = PreferencesStore::in_dir(dir.path()).load().unwrap();
        assert_eq!(prefs, Preferences::default());
        assert!(!prefs.has_key());
        assert_eq!(prefs.model_or_default(), DEFAULT_MODEL);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::in_dir(dir.path().join("nested"));
        store
            .save_credential(&ProviderCredential::new(" sk-or-1 ", "anthropic/claude-3.5-sonnet"))
            .unwrap();

        let prefs = store.load().unwrap();
        assert_eq!(prefs.api_key, "sk-or-1");
        assert_eq!(prefs.model, "anthropic/claude-3.5-sonnet");
        assert!(prefs.has_key());
    }

    #[test]
    fn file_uses_fixed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::in_dir(dir.path());
        store
            .save(&Preferences {
                api_key: "k".into(),
                model: "m".into(),
            })
            .unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(v["openrouter_api_key"], "k");
        assert_eq!(v["openrouter_model"], "m");
    }

    #[test]
    fn save_model_keeps_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::in_dir(dir.path());
        store.save_credential(&ProviderCredential::new("k", "a")).unwrap();
        store.save_model("b").unwrap();
        let prefs = store.load().unwrap();
        assert_eq!((prefs.api_key.as_str(), prefs.model.as_str()), ("k", "b"));
    }

    #[test]
    fn corrupt_file_is_preferences_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::in_dir(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load().unwrap_err(), QuizError::Preferences { .. }));
    }

    #[test]
    fn debug_redacts_key() {
        let p = Preferences {
            api_key: "sk-secret".into(),
            model: "m".into(),
        };
        assert!(!format!("{p:?}").contains("sk-secret"));
    }
}
