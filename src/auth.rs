//! API key storage and lookup.
//!
//! The key is never part of the source tree or the config file. It is read
//! from `GEMINI_API_KEY` when set, otherwise from the platform keyring entry
//! written by `parley auth`.

use std::error::Error;
use std::fmt;
use std::io::{self, Write};

use keyring::Entry;
use tracing::debug;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
const KEYRING_SERVICE: &str = "parley";
const KEYRING_USER: &str = "gemini";

#[derive(Debug)]
pub enum AuthError {
    /// Neither the environment nor the keyring holds a key.
    MissingApiKey,
    EmptyKey,
    /// The credential store could not be reached right now, e.g. a locked
    /// keychain or no running secret service. Retrying later may work.
    KeyringUnavailable(keyring::Error),
    /// The credential store answered but rejected the request.
    Keyring(keyring::Error),
    Io(io::Error),
}

impl AuthError {
    /// Suggestions printed under the error by the CLI.
    pub fn quick_fixes(&self) -> Vec<String> {
        match self {
            AuthError::MissingApiKey => vec![
                "parley auth                      # store a key in the system keyring".to_string(),
                format!("export {API_KEY_ENV}=\"...\"   # or use an environment variable"),
            ],
            AuthError::KeyringUnavailable(_) => vec![
                "Unlock your system keyring and try again".to_string(),
                format!("export {API_KEY_ENV}=\"...\"   # bypass the keyring"),
            ],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingApiKey => write!(f, "No Gemini API key configured"),
            AuthError::EmptyKey => write!(f, "API key cannot be empty"),
            AuthError::KeyringUnavailable(err) => write!(f, "Keyring is unavailable: {err}"),
            AuthError::Keyring(err) => write!(f, "Keyring access failed: {err}"),
            AuthError::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AuthError::KeyringUnavailable(err) | AuthError::Keyring(err) => Some(err),
            AuthError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<keyring::Error> for AuthError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                AuthError::KeyringUnavailable(err)
            }
            other => AuthError::Keyring(other),
        }
    }
}

impl From<io::Error> for AuthError {
    fn from(err: io::Error) -> Self {
        AuthError::Io(err)
    }
}

/// Picks the key to use: a non-blank environment value wins, then the stored
/// one. `stored` is only consulted when the environment has nothing.
pub fn pick_api_key(
    env_value: Option<String>,
    stored: impl FnOnce() -> Result<Option<String>, AuthError>,
) -> Result<String, AuthError> {
    if let Some(key) = env_value.map(|v| v.trim().to_string()) {
        if !key.is_empty() {
            debug!("using API key from {API_KEY_ENV}");
            return Ok(key);
        }
    }
    match stored()? {
        Some(key) if !key.trim().is_empty() => {
            debug!("using API key from keyring");
            Ok(key.trim().to_string())
        }
        _ => Err(AuthError::MissingApiKey),
    }
}

pub struct AuthManager {
    service: String,
}

impl AuthManager {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, AuthError> {
        Ok(Entry::new(&self.service, KEYRING_USER)?)
    }

    pub fn store_key(&self, key: &str) -> Result<(), AuthError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AuthError::EmptyKey);
        }
        self.entry()?.set_password(key)?;
        Ok(())
    }

    pub fn stored_key(&self) -> Result<Option<String>, AuthError> {
        match self.entry()?.get_password() {
            Ok(key) => Ok(Some(key)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns true if a key was removed.
    pub fn remove_key(&self) -> Result<bool, AuthError> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn resolve_api_key(&self) -> Result<String, AuthError> {
        pick_api_key(std::env::var(API_KEY_ENV).ok(), || self.stored_key())
    }

    pub fn interactive_auth(&self) -> Result<(), AuthError> {
        println!("🔐 Parley Authentication Setup");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!();

        let status = match self.stored_key()? {
            Some(_) => "✓ configured",
            None => "not configured",
        };
        println!("Gemini API key: {status}");
        println!();

        print!("Enter your Gemini API key: ");
        io::stdout().flush()?;

        let mut key = String::new();
        io::stdin().read_line(&mut key)?;
        self.store_key(&key)?;

        println!();
        println!("✅ API key stored securely in the system keyring.");
        println!("You can now run parley without setting {API_KEY_ENV}.");
        Ok(())
    }

    pub fn interactive_deauth(&self) -> Result<(), AuthError> {
        if self.remove_key()? {
            println!("✅ Removed stored Gemini API key.");
        } else {
            println!("No stored Gemini API key to remove.");
        }
        Ok(())
    }
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_key_wins_without_touching_keyring() {
        let key = pick_api_key(Some("  env-key ".into()), || {
            panic!("keyring should not be consulted")
        })
        .expect("key");
        assert_eq!(key, "env-key");
    }

    #[test]
    fn blank_environment_falls_back_to_stored_key() {
        let key = pick_api_key(Some("   ".into()), || Ok(Some("stored".into()))).expect("key");
        assert_eq!(key, "stored");
    }

    #[test]
    fn missing_everywhere_is_reported_with_fixes() {
        let err = pick_api_key(None, || Ok(None)).expect_err("no key");
        assert!(matches!(err, AuthError::MissingApiKey));
        assert_eq!(err.quick_fixes().len(), 2);
    }

    #[test]
    fn keyring_outage_propagates_with_fixes() {
        let err = pick_api_key(None, || {
            Err(keyring::Error::NoStorageAccess("locked".to_string().into()).into())
        })
        .expect_err("keyring down");
        assert!(matches!(err, AuthError::KeyringUnavailable(_)));
        assert!(!err.quick_fixes().is_empty());
        assert!(err.source().is_some());
    }

    #[test]
    fn rejected_keyring_requests_have_no_quick_fix() {
        let err = AuthError::from(keyring::Error::TooLong("user".into(), 8));
        assert!(matches!(err, AuthError::Keyring(_)));
        assert!(err.quick_fixes().is_empty());
    }
}
