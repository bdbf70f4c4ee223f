//! Async timeout wrappers.
//!
//! Timeouts here are wall-clock bounds on single operations, not
//! application-level deadlines. A timed-out operation surfaces as
//! [`Error::Timeout`]; no retry is attempted.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Default bound on an outbound connection attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1500);

/// Default bound on a single read from an open socket
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Run `fut` under a wall-clock bound, mapping elapsed time to `Error::Timeout`.
pub async fn with_timeout<T, F>(duration: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_bound() {
        let out = with_timeout(Duration::from_millis(100), async { Ok(7u8) }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn elapses_to_timeout_error() {
        let out = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        })
        .await;
        assert!(matches!(out, Err(Error::Timeout)));
    }
}
