use serde_json::Value;
use tokio::sync::mpsc;

use crate::core::dispatch::DispatchError;
use crate::core::gemini::GeminiClient;
use crate::core::session::PendingDispatch;

/// Result of one dispatch, delivered back to the task that owns the session.
pub type DispatchResult = Result<Value, DispatchError>;

/// Runs dispatches off the UI task and reports each result on a channel.
#[derive(Clone)]
pub struct ChatService {
    client: GeminiClient,
    tx: mpsc::UnboundedSender<DispatchResult>,
}

impl ChatService {
    pub fn new(client: GeminiClient) -> (Self, mpsc::UnboundedReceiver<DispatchResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { client, tx }, rx)
    }

    pub fn client(&self) -> &GeminiClient {
        &self.client
    }

    pub fn spawn_dispatch(&self, pending: PendingDispatch) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client.generate(&pending.text).await;
            let _ = tx.send(result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatch::{Dispatcher, HttpReply};
    use crate::core::retry::RetryPolicy;
    use crate::core::reply::FALLBACK_REPLY;
    use crate::core::session::{ChatSession, Phase};
    use crate::utils::test_utils::{ok_reply, RecordingSleeper, ScriptedTransport};
    use std::sync::Arc;

    fn service(
        script: Vec<Result<HttpReply, String>>,
    ) -> (ChatService, mpsc::UnboundedReceiver<DispatchResult>) {
        let dispatcher = Dispatcher::new(
            Arc::new(ScriptedTransport::new(script)),
            Arc::new(RecordingSleeper::default()),
            RetryPolicy::default(),
        );
        ChatService::new(GeminiClient::new(
            dispatcher,
            "https://host/v1beta",
            "gemini-test",
            "key",
            "Gemini",
        ))
    }

    #[tokio::test]
    async fn spawned_dispatch_settles_session() {
        let (service, mut rx) = service(vec![Ok(ok_reply("Hi there!"))]);
        let mut session = ChatSession::default();

        let pending = session.submit("Hello").expect("accepted");
        service.spawn_dispatch(pending);
        assert_eq!(session.phase(), Phase::AwaitingResponse);

        let result = rx.recv().await.expect("dispatch result");
        let reply = session.settle(result).expect("settled");
        assert_eq!(reply.text(), "Hi there!");
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn exhausted_rate_limit_settles_with_one_fallback() {
        let (service, mut rx) = service(vec![Ok(HttpReply::new(429, "quota")); 5]);
        let mut session = ChatSession::default();

        service.spawn_dispatch(session.submit("Hello").expect("accepted"));
        let result = rx.recv().await.expect("dispatch result");
        assert!(matches!(result, Err(DispatchError::ExhaustedRetries { attempts: 5, .. })));

        session.settle(result);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].text(), FALLBACK_REPLY);
        assert_eq!(session.phase(), Phase::Idle);
    }
}
