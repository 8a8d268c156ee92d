//! Bounded-retry wrapper around the model push step.
//!
//! Deployment policy: up to 3 attempts with a fixed 30 second delay between
//! them. The first success wins immediately; exhaustion is terminal. This is
//! operational logic only and never runs during inference.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

#[derive(Debug, Error)]
#[error("push failed after {attempts} attempts: {last_error}")]
pub struct DeployError {
    pub attempts: u32,
    pub last_error: String,
}

/// Runs `op` until it succeeds or the attempt budget is spent. Returns the
/// number of attempts used on success. No delay follows the last attempt.
pub async fn push_with_retry<F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<u32, DeployError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<(), String>>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match op(attempt).await {
            Ok(()) => return Ok(attempt),
            Err(e) => {
                debug!("push attempt {attempt} of {attempts} failed: {e}");
                last_error = e;
            }
        }
        if attempt < attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }
    Err(DeployError { attempts, last_error })
}

/// One `cog push` invocation in the model directory.
pub async fn cog_push(dir: &Path, image_ref: &str) -> Result<(), String> {
    let status = Command::new("cog")
        .arg("push")
        .arg(image_ref)
        .current_dir(dir)
        .status()
        .await
        .map_err(|e| format!("failed to run cog: {e}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("cog push exited with {status}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let calls = AtomicU32::new(0);
        let used = push_with_retry(&RetryPolicy::default(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await
        .unwrap();
        assert_eq!(used, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let used = push_with_retry(&RetryPolicy::default(), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(format!("attempt {n} failed"))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(used, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_three_attempts_with_fixed_delay() {
        let start = tokio::time::Instant::now();
        let calls = AtomicU32::new(0);
        let err = push_with_retry(&RetryPolicy::default(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("no space left on device".to_string()) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two 30s delays separate the three attempts; none follows the last.
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert!(err.to_string().contains("no space left on device"));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            attempts: 0,
            delay: Duration::ZERO,
        };
        let used = push_with_retry(&policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await
        .unwrap();
        assert_eq!(used, 1);
    }
}
