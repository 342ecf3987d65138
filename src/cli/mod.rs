//! Command-line interface parsing and handling
//!
//! This module parses arguments, wires configuration, credentials and
//! logging together, and dispatches into the chat UI or a one-shot command.

pub mod say;

use std::error::Error;

use clap::{Parser, Subcommand};

use crate::auth::{AuthError, AuthManager};
use crate::core::chat_service::ChatService;
use crate::core::config::Config;
use crate::core::dispatch::Dispatcher;
use crate::core::gemini::GeminiClient;
use crate::core::message::Participant;
use crate::core::session::ChatSession;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::{self, LogTarget};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

#[derive(Parser)]
#[command(name = "parley")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "A terminal chat interface for Gemini models")]
#[command(
    long_about = "Parley is a full-screen terminal chat interface that sends each message to a \
hosted Gemini model and shows the reply. Rate-limited requests are retried with \
exponential backoff.\n\n\
Authentication:\n\
  Use 'parley auth' to store your API key in the system keyring.\n\n\
Environment Variables:\n\
  GEMINI_API_KEY    API key (takes precedence over the keyring)\n\
  PARLEY_LOG        Log filter, e.g. parley=debug (used with --log)\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Up/Down/PgUp/PgDn Scroll through chat history\n\
  Ctrl+C / Esc      Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use instead of the configured default
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Write diagnostic logs to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send a single message and print the reply
    Say {
        /// Message text (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        prompt: Vec<String>,
    },
    /// Store a Gemini API key in the system keyring
    Auth,
    /// Remove the stored Gemini API key
    Deauth,
    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        value: Vec<String>,
    },
    /// Reset a configuration value to its default
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Print the current configuration
    Config,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            logging::init(&LogTarget::from_option(args.log, LogTarget::Disabled))?;
            let config = Config::load()?;
            let client = build_client(&config, args.model)?;
            let session = session_for(&config);
            let (service, rx) = ChatService::new(client);
            run_chat(session, service, rx).await
        }
        Commands::Say { prompt } => {
            logging::init(&LogTarget::from_option(args.log, LogTarget::Stderr))?;
            let config = Config::load()?;
            let client = build_client(&config, args.model)?;
            say::run_say(prompt.join(" "), session_for(&config), client).await
        }
        Commands::Auth => {
            if let Err(e) = AuthManager::new().interactive_auth() {
                eprintln!("❌ Authentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Deauth => {
            if let Err(e) = AuthManager::new().interactive_deauth() {
                eprintln!("❌ Deauthentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            let value = value.join(" ");
            if let Err(e) = config.set(&key, &value) {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Set {key} to: {}", value.trim());
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            if let Err(e) = config.unset(&key) {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Commands::Config => {
            Config::load()?.print_all();
            Ok(())
        }
    }
}

fn session_for(config: &Config) -> ChatSession {
    ChatSession::new(
        Participant::human(config.user_name()),
        Participant::assistant(config.assistant_name()),
    )
}

/// Resolves the API key and builds a client for the configured endpoint.
/// Exits with quick fixes when no key is available.
fn build_client(
    config: &Config,
    model_override: Option<String>,
) -> Result<GeminiClient, Box<dyn Error>> {
    let api_key = match AuthManager::new().resolve_api_key() {
        Ok(key) => key,
        Err(err) => {
            report_auth_error(&err);
            std::process::exit(1);
        }
    };

    let model = model_override
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| config.model().to_string());
    let dispatcher = Dispatcher::http(reqwest::Client::new(), config.retry_policy());

    Ok(GeminiClient::new(
        dispatcher,
        config.base_url(),
        model,
        api_key,
        config.assistant_name(),
    ))
}

fn report_auth_error(err: &AuthError) {
    eprintln!("❌ {err}");
    let fixes = err.quick_fixes();
    if !fixes.is_empty() {
        eprintln!();
        eprintln!("💡 Quick fixes:");
        for fix in fixes {
            eprintln!("  • {fix}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_chat() {
        let args = Args::try_parse_from(["parley"]).expect("parse");
        assert!(args.command.is_none());
    }

    #[test]
    fn say_joins_trailing_words() {
        let args = Args::try_parse_from(["parley", "say", "hello", "-there"]).expect("parse");
        match args.command {
            Some(Commands::Say { prompt }) => assert_eq!(prompt.join(" "), "hello -there"),
            _ => panic!("expected say"),
        }
    }

    #[test]
    fn model_flag_is_accepted_before_subcommand() {
        let args =
            Args::try_parse_from(["parley", "-m", "gemini-pro", "say", "hi"]).expect("parse");
        assert_eq!(args.model.as_deref(), Some("gemini-pro"));
    }

    #[test]
    fn session_uses_configured_names() {
        let mut config = Config::default();
        config.set("user-name", "Sam").expect("set");
        config.set("assistant-name", "Ada").expect("set");
        let session = session_for(&config);
        assert_eq!(session.human().name, "Sam");
        assert_eq!(session.assistant().name, "Ada");
    }
}
