//! Concurrent fan-out for independent mirror and fansub lookups.

use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use tracing::warn;

/// Run `f` on every item concurrently and concatenate the results in input order.
///
/// Each task stands alone: an `Err` is logged and contributes nothing.
pub async fn parallel_flat_map<I, T, E, F, Fut>(items: I, f: F) -> Vec<T>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
    E: Display,
{
    join_all(items.into_iter().map(f))
        .await
        .into_iter()
        .flat_map(|result| match result {
            Ok(values) => values,
            Err(e) => {
                warn!(error = %e, "Parallel task failed");
                Vec::new()
            }
        })
        .collect()
}

/// Same as [`parallel_flat_map`] for tasks that already swallow their errors.
pub async fn parallel_flatten<I, T, F, Fut>(items: I, f: F) -> Vec<T>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = Vec<T>>,
{
    join_all(items.into_iter().map(f))
        .await
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::error::ExtractorError;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_isolated_and_order_kept() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let results = parallel_flat_map(1u64..=4, |n| async move {
            // later items finish first
            tokio::time::sleep(Duration::from_millis(100 / n)).await;
            if n == 2 {
                Err(ExtractorError::NoStreamsFound)
            } else {
                Ok(vec![n * 10, n * 10 + 1])
            }
        })
        .await;
        assert_eq!(results, [10, 11, 30, 31, 40, 41]);
    }

    #[tokio::test]
    async fn test_all_failing_is_empty() {
        let results: Vec<u8> =
            parallel_flat_map(0..3, |_| async { Err::<Vec<u8>, _>("down") }).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_flatten() {
        let results = parallel_flatten(["a", "b"], |s| async move { vec![s.to_uppercase()] }).await;
        assert_eq!(results, ["A", "B"]);
    }
}
