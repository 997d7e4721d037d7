//! Topic routing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::RawMessage;
use crate::error::Result;

/// Processes one message. Errors are reported to the runner, which logs them
/// and moves on.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &RawMessage) -> Result<()>;
}

/// Exact-match topic → handler table. Topics without a route are ignored so
/// one group can subscribe to a superset of the topics it handles.
#[derive(Default, Clone)]
pub struct TopicRouter {
    routes: HashMap<String, Arc<dyn MessageHandler>>,
}

impl TopicRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, topic: impl Into<String>, handler: Arc<dyn MessageHandler>) -> Self {
        self.routes.insert(topic.into(), handler);
        self
    }

    pub fn handles(&self, topic: &str) -> bool {
        self.routes.contains_key(topic)
    }

    /// Routed topics, sorted
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.routes.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub async fn dispatch(&self, message: &RawMessage) -> Result<()> {
        match self.routes.get(&message.topic) {
            Some(handler) => handler.handle(message).await,
            None => {
                debug!(topic = %message.topic, offset = message.offset, "No route for topic, skipping");
                Ok(())
            },
        }
    }
}

#[async_trait]
impl MessageHandler for TopicRouter {
    async fn handle(&self, message: &RawMessage) -> Result<()> {
        self.dispatch(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MessageHandler for Counting {
        async fn handle(&self, _message: &RawMessage) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_matches_exact_topic() {
        let handler = Arc::new(Counting::default());
        let router = TopicRouter::new().route("shark.account", handler.clone());

        router
            .dispatch(&RawMessage::new("shark.account", 0, 1, b"{}".to_vec()))
            .await
            .unwrap();
        router
            .dispatch(&RawMessage::new("shark.account.v2", 0, 2, b"{}".to_vec()))
            .await
            .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_topic_is_noop() {
        let handler = Arc::new(Counting::default());
        let router = TopicRouter::new().route("shark.account", handler.clone());

        let result = router
            .dispatch(&RawMessage::new("unknown.topic", 0, 1, b"garbage".to_vec()))
            .await;

        assert!(result.is_ok());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert!(!router.handles("unknown.topic"));
        assert_eq!(router.topics(), vec!["shark.account".to_string()]);
    }
}
