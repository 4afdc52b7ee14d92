use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::handler::JsonRpcHandler;

/// Thread-safe mapping from method name to handler.
///
/// Method names are canonicalized to lower case at registration and lookup,
/// so dispatch is case-insensitive. Registration is rare relative to
/// dispatch, which is why a reader/writer lock (shared lookups, exclusive
/// registration) is sufficient here.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn JsonRpcHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handler under the lower-cased method name. The last
    /// registration for a name wins. Safe to call while dispatches are in
    /// flight.
    pub fn register(&self, method: &str, handler: Arc<dyn JsonRpcHandler>) {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handlers.insert(method.to_lowercase(), handler);
    }

    /// Case-insensitive lookup under the shared lock.
    pub fn lookup(&self, method: &str) -> Option<Arc<dyn JsonRpcHandler>> {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handlers.get(&method.to_lowercase()).cloned()
    }

    /// Registered method names, in no particular order.
    pub fn methods(&self) -> Vec<String> {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handlers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::handler::typed;
    use std::convert::Infallible;

    fn echo_handler(tag: &'static str) -> Arc<dyn JsonRpcHandler> {
        Arc::new(typed(move |_ctx: RequestContext, _req: ()| async move {
            Ok::<_, Infallible>(tag)
        }))
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = HandlerRegistry::new();
        registry.register("Multiply", echo_handler("m"));

        assert!(registry.lookup("multiply").is_some());
        assert!(registry.lookup("MULTIPLY").is_some());
        assert!(registry.lookup("divide").is_none());
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let registry = HandlerRegistry::new();
        registry.register("echo", echo_handler("first"));
        registry.register("ECHO", echo_handler("second"));

        assert_eq!(registry.methods(), vec!["echo".to_string()]);
        let handler = registry.lookup("echo").unwrap();
        let result = handler.call(RequestContext::new(), None).await.unwrap();
        assert_eq!(result.get(), r#""second""#);
    }
}
