//! Run-progress callbacks.

use llmproc_types::{ApiResponse, ToolResult};

/// Observer of run progress.
///
/// All methods default to no-ops; implement the ones you need and register
/// the hook on the process. Hooks are called synchronously from the driver
/// loop, so keep them cheap.
pub trait RunHook: Send + Sync {
    /// Called after each provider response is recorded.
    fn on_api_response(&self, response: &ApiResponse) {
        let _ = response;
    }

    /// Called before a tool executes.
    fn on_tool_start(&self, name: &str, args: &serde_json::Value) {
        let _ = (name, args);
    }

    /// Called after a tool result is recorded (post auto-wrap).
    fn on_tool_end(&self, name: &str, result: &ToolResult) {
        let _ = (name, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmproc_types::{Message, StopReason, TokenUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        responses: AtomicUsize,
    }

    impl RunHook for Counter {
        fn on_api_response(&self, _response: &ApiResponse) {
            self.responses.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn default_methods_are_noops() {
        struct Silent;
        impl RunHook for Silent {}
        let hook = Silent;
        hook.on_tool_start("calculator", &serde_json::json!({}));
        hook.on_tool_end("calculator", &ToolResult::ok("4"));
    }

    #[test]
    fn overridden_method_observes() {
        let hook = Counter::default();
        let response = ApiResponse {
            id: "m".into(),
            model: "m".into(),
            message: Message::assistant("hi"),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        };
        hook.on_api_response(&response);
        hook.on_api_response(&response);
        assert_eq!(hook.responses.load(Ordering::SeqCst), 2);
    }
}
