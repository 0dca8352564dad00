//! Retry logic with exponential backoff for transient remoting errors.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;

/// Callback trait for retry progress notifications.
pub trait RetryCallback: Send + Sync {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Current attempt number (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay_secs` - Seconds until next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64);
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64) {
        log::warn!("Attempt {attempt}/{max_attempts} failed: {error}. Retrying in {delay_secs}s...");
    }
}

/// Execute an operation with retry logic.
///
/// Retries the operation if it returns a retryable error, using exponential
/// backoff between attempts. Non-retryable errors are returned at once.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut last_error: Option<Error> = None;

    for attempt in 0..config.max_attempts.max(1) {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }

                if attempt + 1 >= config.max_attempts {
                    last_error = Some(e);
                    break;
                }

                let delay = config.delay_for_attempt(attempt);
                if let Some(cb) = callback {
                    cb.on_retry(attempt + 1, config.max_attempts, &e, delay.as_secs());
                }

                thread::sleep(delay);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Other("retry exhausted".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(10),
        }
    }

    fn unreachable() -> Error {
        Error::UnreachableHost {
            host: "srv01".to_string(),
            message: "WinRM cannot complete the operation".to_string(),
        }
    }

    #[test]
    fn test_with_retry_success_first_try() {
        let result = with_retry(&RetryConfig::no_retry(), None, || Ok::<_, Error>(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_install_failure_is_not_retried() {
        let attempts = Cell::new(0);

        let result: Result<()> = with_retry(&fast_config(3), None, || {
            attempts.set(attempts.get() + 1);
            Err(Error::InstallFailed {
                host: "srv01".to_string(),
                name: "Web-Server".to_string(),
                cause: "source files not found".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_unreachable_host_eventually_answers() {
        let attempts = Cell::new(0);

        let result = with_retry(&fast_config(3), None, || {
            let current = attempts.get();
            attempts.set(current + 1);
            if current < 2 { Err(unreachable()) } else { Ok("ok") }
        });

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_callback_invoked_between_attempts() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingCallback(Arc<AtomicU32>);
        impl RetryCallback for CountingCallback {
            fn on_retry(&self, _: u32, _: u32, _: &Error, _: u64) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let count = Arc::new(AtomicU32::new(0));
        let callback = CountingCallback(count.clone());

        let result: Result<()> = with_retry(&fast_config(3), Some(&callback), || Err(unreachable()));

        assert!(matches!(result, Err(Error::UnreachableHost { .. })));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
