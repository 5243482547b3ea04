//! Turn cancellation.
//!
//! A single [`CancellationToken`] is created per turn and handed to every
//! outbound call (completion, CRM gateway, image services). Dropping the
//! in-flight future aborts the underlying HTTP request.

use std::future::Future;

pub use tokio_util::sync::CancellationToken;

/// Marker returned when a future lost the race against its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("operation cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Run `fut` until it completes or `token` fires, whichever comes first.
///
/// An already-cancelled token wins without polling `fut`.
pub async fn run_cancellable<F, T>(token: &CancellationToken, fut: F) -> Result<T, Cancelled>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let out = run_cancellable(&token, async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn pre_cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let out = run_cancellable(&token, async { 7 }).await;
        assert_eq!(out, Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_pending_future() {
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            child.cancel();
        });
        let out = run_cancellable(&token, tokio::time::sleep(Duration::from_secs(3600))).await;
        assert_eq!(out, Err(Cancelled));
    }
}
