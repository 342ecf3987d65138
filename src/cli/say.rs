//! TUI-less "say" command

use std::error::Error;

use crate::core::gemini::GeminiClient;
use crate::core::message::Message;
use crate::core::session::ChatSession;

/// Runs one submit/dispatch/settle cycle and returns the assistant message.
/// Blank prompts produce `None` without touching the network.
pub async fn exchange(
    session: &mut ChatSession,
    client: &GeminiClient,
    text: &str,
) -> Option<Message> {
    let pending = session.submit(text)?;
    let result = client.generate(&pending.text).await;
    session.settle(result).cloned()
}

pub async fn run_say(
    prompt: String,
    mut session: ChatSession,
    client: GeminiClient,
) -> Result<(), Box<dyn Error>> {
    match exchange(&mut session, &client, &prompt).await {
        Some(reply) => {
            println!("{}", reply.text());
            Ok(())
        }
        None => {
            eprintln!("Usage: parley say <prompt>");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatch::{Dispatcher, HttpReply};
    use crate::core::reply::FALLBACK_REPLY;
    use crate::core::retry::RetryPolicy;
    use crate::core::session::Phase;
    use crate::utils::test_utils::{ok_reply, RecordingSleeper, ScriptedTransport};
    use std::sync::Arc;

    fn client(script: Vec<Result<HttpReply, String>>) -> (GeminiClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(script));
        let dispatcher = Dispatcher::new(
            transport.clone(),
            Arc::new(RecordingSleeper::default()),
            RetryPolicy::default(),
        );
        (
            GeminiClient::new(dispatcher, "https://host/v1beta", "gemini-test", "key", "Gemini"),
            transport,
        )
    }

    #[tokio::test]
    async fn exchange_returns_reply_and_leaves_session_idle() {
        let (client, _) = client(vec![Ok(ok_reply("Hi there!"))]);
        let mut session = ChatSession::default();

        let reply = exchange(&mut session, &client, "Hello").await.expect("reply");
        assert_eq!(reply.text(), "Hi there!");
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn exchange_degrades_to_fallback_on_server_error() {
        let (client, _) = client(vec![Ok(HttpReply::new(500, "internal"))]);
        let mut session = ChatSession::default();

        let reply = exchange(&mut session, &client, "Hello").await.expect("reply");
        assert_eq!(reply.text(), FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn blank_prompt_never_reaches_the_network() {
        let (client, transport) = client(Vec::new());
        let mut session = ChatSession::default();

        assert!(exchange(&mut session, &client, "  ").await.is_none());
        assert_eq!(transport.calls(), 0);
    }
}
