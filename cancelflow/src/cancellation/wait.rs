//! Interruptible waits.

use super::CancellationToken;
use crate::errors::Cancelled;
use std::future::Future;
use std::time::Duration;

/// Runs `future` until it resolves or `token` is cancelled, whichever comes first.
///
/// The token is polled first, so once it has fired the future's output is
/// never observed. A `None` token never interrupts.
pub async fn until_cancelled<F>(
    future: F,
    token: Option<&CancellationToken>,
) -> Result<F::Output, Cancelled>
where
    F: Future,
{
    let Some(token) = token else {
        return Ok(future.await);
    };

    tokio::select! {
        biased;
        () = token.cancelled() => Err(token.cancellation_error()),
        output = future => Ok(output),
    }
}

/// Sleeps for `duration`, returning early with [`Cancelled`] the moment `token` fires.
pub async fn delay(duration: Duration, token: Option<&CancellationToken>) -> Result<(), Cancelled> {
    until_cancelled(tokio::time::sleep(duration), token).await
}
