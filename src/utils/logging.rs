//! Diagnostic logging via `tracing`.
//!
//! The full-screen UI owns the terminal, so interactive sessions only log
//! when a file is given. One-shot commands log to stderr.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "PARLEY_LOG";
const DEFAULT_DIRECTIVE: &str = "parley=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
    Disabled,
}

impl LogTarget {
    /// File when one was requested, otherwise `fallback`.
    pub fn from_option(path: Option<String>, fallback: LogTarget) -> Self {
        match path {
            Some(path) if !path.trim().is_empty() => LogTarget::File(PathBuf::from(path)),
            _ => fallback,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

pub fn init(target: &LogTarget) -> Result<(), Box<dyn std::error::Error>> {
    match target {
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(env_filter())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false),
                )
                .try_init()?;
        }
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
        LogTarget::Disabled => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_path_uses_fallback() {
        assert_eq!(
            LogTarget::from_option(Some("  ".into()), LogTarget::Stderr),
            LogTarget::Stderr
        );
        assert_eq!(
            LogTarget::from_option(None, LogTarget::Disabled),
            LogTarget::Disabled
        );
    }

    #[test]
    fn explicit_path_selects_file() {
        assert_eq!(
            LogTarget::from_option(Some("parley.log".into()), LogTarget::Disabled),
            LogTarget::File(PathBuf::from("parley.log"))
        );
    }
}
