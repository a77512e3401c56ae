use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellation carrier passed to bound methods.
///
/// The server creates one per request and cancels it when the request
/// future is dropped. Client stubs stop waiting on the transport as soon as
/// the context they were given is cancelled.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that is cancelled together with `self`, but can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub(crate) fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}
