//! Drives async saves from synchronous code.

use crate::error::{CoreError, CoreResult};
use std::future::Future;
use std::thread;

/// Runs `future` to completion on a private current-thread runtime.
///
/// The runtime lives on a scoped helper thread, so this works both from
/// plain threads and from inside a tokio runtime (where blocking the
/// caller's worker is the caller's choice).
pub(crate) fn block_on<F>(future: F) -> CoreResult<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    thread::scope(|scope| {
        scope
            .spawn(move || -> CoreResult<F::Output> {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| CoreError::blocking(format!("failed to create runtime: {e}")))?;
                Ok(runtime.block_on(future))
            })
            .join()
            .map_err(|_| CoreError::blocking("save thread panicked"))?
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_without_a_runtime() {
        assert_eq!(block_on(async { 1 + 1 }).unwrap(), 2);
    }

    #[tokio::test]
    async fn runs_inside_a_runtime() {
        let value = block_on(async {
            tokio::task::yield_now().await;
            "done"
        })
        .unwrap();
        assert_eq!(value, "done");
    }
}
