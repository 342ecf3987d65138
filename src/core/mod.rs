pub mod chat_service;
pub mod config;
pub mod dispatch;
pub mod gemini;
pub mod message;
pub mod reply;
pub mod retry;
pub mod session;
