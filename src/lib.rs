//! Parley is a terminal chat client for hosted Gemini models.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation session, the retrying dispatcher and the
//!   reply adapter that turns API responses into transcript messages.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop.
//! - [`auth`] resolves the API key from the environment or the system
//!   keyring.
//! - [`api`] defines the `generateContent` request payload.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
