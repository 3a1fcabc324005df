use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A child of `parent` that is additionally cancelled once `timeout` elapses.
///
/// Dropping the guard stops the timer; the token stays usable.
pub struct Deadline {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl Deadline {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Derive a token that fires on `parent` cancellation or after `timeout`.
/// Must be called from within a tokio runtime.
pub fn cancel_after(parent: &CancellationToken, timeout: Duration) -> Deadline {
    let token = parent.child_token();
    let t = token.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        t.cancel();
    });
    Deadline { token, timer }
}
