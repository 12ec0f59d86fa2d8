//! # Async Bridge
//!
//! A command runs on one thread and wants one answer; the transport answers
//! through a pair of callbacks fired from its own context. The bridge joins
//! the two worlds:
//!
//! 1. A [`CallbackState`] wraps a single-slot `oneshot` channel. Both handlers
//!    share it, and whichever fires first takes the sender. A late or repeated
//!    callback finds the slot empty and is dropped.
//! 2. [`AsyncBridge::call`] issues the request, lets the client drive its I/O
//!    via `wait`, then blocks on the slot until the overall deadline.
//! 3. [`AsyncBridge::complete`] folds the outcome into a [`ConsoleResult`],
//!    rendering data to normal output and failures to diagnostic output.
//!
//! There are no retries here; a command that wants one calls again.

use crate::client::{CallError, Handlers, RemoteClient};
use crate::error::{RemoteError, Result};
use crate::result::ConsoleResult;
use serde_json::Value;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    DataReceived(Value),
    ErrorReceived(CallError),
}

/// Single-slot completion shared by the success and error handlers of one call.
#[derive(Clone)]
pub struct CallbackState {
    slot: Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>,
}

impl CallbackState {
    pub fn new() -> (Self, oneshot::Receiver<CallbackOutcome>) {
        let (sender, receiver) = oneshot::channel();
        let state = Self {
            slot: Arc::new(Mutex::new(Some(sender))),
        };
        (state, receiver)
    }

    /// Returns `false` when the call had already completed and `outcome` was ignored.
    pub fn complete(&self, outcome: CallbackOutcome) -> bool {
        let sender = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(sender) => {
                // The receiver may have given up after a timeout; that is fine.
                let _ = sender.send(outcome);
                true
            }
            None => {
                debug!("ignoring callback for a call that already completed");
                false
            }
        }
    }

    pub fn handlers(&self) -> Handlers {
        let failed = self.clone();
        let succeeded = self.clone();
        Handlers {
            on_error: Box::new(move |error| {
                failed.complete(CallbackOutcome::ErrorReceived(error));
            }),
            on_success: Box::new(move |payload| {
                succeeded.complete(CallbackOutcome::DataReceived(payload));
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AsyncBridge {
    timeout: Duration,
}

impl AsyncBridge {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Issue one request and block until it completes or the deadline passes.
    pub fn call(
        &self,
        client: &mut dyn RemoteClient,
        method: &str,
        params: Value,
    ) -> std::result::Result<Value, RemoteError> {
        let deadline = Instant::now() + self.timeout;
        let (state, receiver) = CallbackState::new();

        client.request(method, params, state.handlers());
        // Only the handlers keep the sender alive now, so a client that drops
        // them unfired shows up as a closed channel instead of a timeout.
        drop(state);

        if !client.wait(self.timeout) {
            debug!(method, "client still busy when its wait elapsed");
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| RemoteError::Transport(format!("cannot start runtime: {}", e)))?;
        // The timer needs the runtime's time driver, so it is created inside block_on.
        let received =
            runtime.block_on(async move { tokio::time::timeout(remaining, receiver).await });

        match received {
            Ok(Ok(CallbackOutcome::DataReceived(payload))) => {
                debug!(method, "call completed");
                Ok(payload)
            }
            Ok(Ok(CallbackOutcome::ErrorReceived(error))) => {
                debug!(method, ?error, "call failed");
                Err(error.into())
            }
            Ok(Err(_)) => Err(RemoteError::Transport(
                "request was abandoned without a response".to_string(),
            )),
            Err(_) => {
                warn!(method, timeout_ms = self.timeout.as_millis() as u64, "call timed out");
                Err(RemoteError::Timeout(self.timeout))
            }
        }
    }

    /// Run a call and classify it, handing any payload to `render`.
    pub fn complete<R>(
        &self,
        client: &mut dyn RemoteClient,
        method: &str,
        params: Value,
        render: R,
        output: &mut dyn Write,
        error: &mut dyn Write,
    ) -> ConsoleResult
    where
        R: FnOnce(Value, &mut dyn Write) -> Result<()>,
    {
        let outcome = self
            .call(client, method, params)
            .map_err(Into::into)
            .and_then(|payload| render(payload, output));

        match outcome {
            Ok(()) => ConsoleResult::Success,
            Err(e) => {
                let _ = writeln!(error, "Error: {}", e);
                ConsoleResult::Failure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ErrorCode;
    use crate::error::BexError;
    use crate::test_utils::{Script, ScriptedClient};
    use serde_json::json;

    fn echo(payload: Value, output: &mut dyn Write) -> Result<()> {
        writeln!(output, "{}", payload)?;
        Ok(())
    }

    fn run(script: Script, timeout: Duration) -> (ConsoleResult, String, String) {
        let mut client = ScriptedClient::new(script);
        let mut output = Vec::new();
        let mut error = Vec::new();
        let result = AsyncBridge::new(timeout).complete(
            &mut client,
            "blockchain.fetch_last_height",
            json!({}),
            echo,
            &mut output,
            &mut error,
        );
        (
            result,
            String::from_utf8(output).unwrap(),
            String::from_utf8(error).unwrap(),
        )
    }

    #[test]
    fn test_state_completes_once() {
        let (state, mut receiver) = CallbackState::new();
        assert!(state.complete(CallbackOutcome::DataReceived(json!(1))));
        assert!(!state.complete(CallbackOutcome::ErrorReceived(CallError::Server(
            ErrorCode::new(2, "late")
        ))));
        assert_eq!(
            receiver.try_recv().unwrap(),
            CallbackOutcome::DataReceived(json!(1))
        );
    }

    #[test]
    fn test_data_renders_and_succeeds() {
        let (result, output, error) = run(Script::Data(json!(812345)), Duration::from_secs(1));
        assert_eq!(result, ConsoleResult::Success);
        assert_eq!(output, "812345\n");
        assert!(error.is_empty());
    }

    #[test]
    fn test_server_error_fails_with_description() {
        let (result, output, error) = run(
            Script::Error(ErrorCode::new(3, "not found")),
            Duration::from_secs(1),
        );
        assert_eq!(result, ConsoleResult::Failure);
        assert!(output.is_empty());
        assert!(error.contains("server error 3: not found"));
    }

    #[test]
    fn test_negative_server_code_is_reported_as_server_error() {
        let (result, _, error) = run(
            Script::Error(ErrorCode::new(-1, "E1 bad request")),
            Duration::from_secs(1),
        );
        assert_eq!(result, ConsoleResult::Failure);
        assert!(error.contains("server error -1: E1 bad request"));
    }

    #[test]
    fn test_call_blocks_without_an_ambient_runtime() {
        // Plain #[test] threads have no tokio context; both outcomes must still arrive.
        let mut client = ScriptedClient::new(Script::Data(json!(5)));
        let payload = AsyncBridge::new(Duration::from_secs(1))
            .call(&mut client, "blockchain.fetch_last_height", json!({}))
            .unwrap();
        assert_eq!(payload, json!(5));

        let mut client = ScriptedClient::new(Script::Silent);
        let err = AsyncBridge::new(Duration::from_millis(50))
            .call(&mut client, "blockchain.fetch_last_height", json!({}))
            .unwrap_err();
        assert_eq!(err, RemoteError::Timeout(Duration::from_millis(50)));
    }

    #[test]
    fn test_second_callback_is_ignored() {
        let (result, output, error) = run(
            Script::DataThenError(json!("first"), ErrorCode::new(9, "second")),
            Duration::from_secs(1),
        );
        assert_eq!(result, ConsoleResult::Success);
        assert_eq!(output, "\"first\"\n");
        assert!(error.is_empty());

        let (result, output, error) = run(
            Script::ErrorThenData(ErrorCode::new(9, "first"), json!("second")),
            Duration::from_secs(1),
        );
        assert_eq!(result, ConsoleResult::Failure);
        assert!(output.is_empty());
        assert!(error.contains("first"));
        assert!(!error.contains("second"));
    }

    #[test]
    fn test_silent_server_times_out() {
        let (result, output, error) = run(Script::Silent, Duration::from_millis(100));
        assert_eq!(result, ConsoleResult::Failure);
        assert!(output.is_empty());
        assert!(error.contains("no response from server within 0.1s"));
    }

    #[test]
    fn test_callback_from_another_thread() {
        let (result, output, _) = run(
            Script::Delayed(Duration::from_millis(50), json!({"height": 7})),
            Duration::from_secs(2),
        );
        assert_eq!(result, ConsoleResult::Success);
        assert!(output.contains("\"height\":7"));
    }

    #[test]
    fn test_dropped_handlers_are_transport_failure() {
        let mut client = ScriptedClient::new(Script::Drop);
        let err = AsyncBridge::new(Duration::from_secs(1))
            .call(&mut client, "blockchain.fetch_last_height", json!({}))
            .unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }

    #[test]
    fn test_render_failure_is_reported() {
        let mut client = ScriptedClient::new(Script::Data(json!([])));
        let mut output = Vec::new();
        let mut error = Vec::new();
        let result = AsyncBridge::new(Duration::from_secs(1)).complete(
            &mut client,
            "blockchain.fetch_history",
            json!({}),
            |_, _| Err(BexError::Validation("unexpected payload".into())),
            &mut output,
            &mut error,
        );
        assert_eq!(result, ConsoleResult::Failure);
        assert!(String::from_utf8(error).unwrap().contains("unexpected payload"));
    }
}
