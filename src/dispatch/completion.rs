//! One-shot completion sinks
//!
//! Every command gets exactly one [`Completion`]. Resolving it consumes
//! it, so a second resolution does not compile. A completion dropped
//! unresolved, e.g. while unwinding from a panic, resolves itself with an
//! internal failure so the caller is never left waiting.

use tokio::sync::oneshot;

use super::Reply;
use crate::error::{BridgeError, Result};

/// Receiving half of a [`Completion`]
pub type CompletionReceiver = oneshot::Receiver<Result<Reply>>;

#[derive(Debug)]
pub struct Completion {
    op: &'static str,
    sender: Option<oneshot::Sender<Result<Reply>>>,
}

impl Completion {
    pub fn new(op: &'static str) -> (Self, CompletionReceiver) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                op,
                sender: Some(sender),
            },
            receiver,
        )
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn succeed(self, value: impl Into<Reply>) {
        self.complete(Ok(value.into()));
    }

    pub fn fail(self, err: BridgeError) {
        self.complete(Err(err));
    }

    pub fn complete(mut self, result: Result<Reply>) {
        if let Err(err) = &result {
            tracing::debug!(op = self.op, code = err.code(), "command failed: {}", err);
        }
        self.send(result);
    }

    fn send(&mut self, result: Result<Reply>) {
        if let Some(sender) = self.sender.take() {
            // The caller may have stopped waiting
            let _ = sender.send(result);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.sender.is_some() {
            tracing::error!(op = self.op, "completion dropped without a result");
            let err = BridgeError::Internal(format!("{} finished without a result", self.op));
            self.send(Err(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_succeed_resolves_once() {
        let (done, reply) = Completion::new("getPageCount");
        done.succeed(3usize);
        assert_eq!(reply.await.unwrap().unwrap(), Reply::Int(3));
    }

    #[tokio::test]
    async fn test_fail_carries_code() {
        let (done, reply) = Completion::new("save");
        done.fail(BridgeError::SaveFailed("disk full".to_string()));
        let err = reply.await.unwrap().unwrap_err();
        assert_eq!(err.code(), "SAVE_FAIL");
    }

    #[tokio::test]
    async fn test_drop_resolves_internal_error() {
        let (done, reply) = Completion::new("exportAnnotations");
        drop(done);
        let err = reply.await.unwrap().unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert!(err.to_string().contains("exportAnnotations"));
    }

    #[test]
    fn test_panic_resolves_internal_error() {
        let (done, mut reply) = Completion::new("save");
        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _held = done;
            panic!("engine exploded");
        }));
        assert!(caught.is_err());
        let err = reply.try_recv().unwrap().unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
