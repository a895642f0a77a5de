use std::{future::Future, time::Duration};

use tokio::time::sleep;

use crate::error::ServiceError;

const MAX_RETRIES: usize = 3;

/// Errors that signal a lost optimistic write and may be retried.
pub trait Conflict {
    fn is_conflict(&self) -> bool;
}

impl Conflict for ServiceError {
    fn is_conflict(&self) -> bool {
        ServiceError::is_conflict(self)
    }
}

/// Re-runs `operation` while it fails with a write conflict, at most three times.
pub async fn retry_operation<F, Fut, T, E>(mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Conflict + std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Err(e) if e.is_conflict() && attempt < MAX_RETRIES => {
                log::warn!("Attempt {} failed: {}. Retrying...", attempt, e);
                attempt += 1;
                sleep(Duration::from_millis(100)).await;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::AddCode;

    #[tokio::test]
    async fn conflicts_are_retried() {
        let calls = Cell::new(0);
        let result = retry_operation(|| {
            calls.set(calls.get() + 1);
            let call = calls.get();
            async move {
                if call < 3 {
                    Err(anyhow::anyhow!("conflict").code(409))
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), ServiceError> = retry_operation(|| {
            calls.set(calls.get() + 1);
            async { Err(anyhow::anyhow!("conflict").code(409)) }
        })
        .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), ServiceError> = retry_operation(|| {
            calls.set(calls.get() + 1);
            async { Err(anyhow::anyhow!("boom").code(500)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
