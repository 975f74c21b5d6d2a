//! Process-lifetime result cache.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

/// Holds the first successful result of a computation, forever.
///
/// Concurrent callers wait on one in-flight computation. A failed attempt
/// stores nothing, so the next caller retries. There is no invalidation.
pub struct ComputeOnce<T> {
    cell: OnceCell<Arc<T>>,
}

impl<T> Default for ComputeOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ComputeOnce<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    pub fn is_populated(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get_or_try_compute<E, F, Fut>(&self, compute: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell
            .get_or_try_init(|| async move { compute().await.map(Arc::new) })
            .await
            .map(Arc::clone)
    }
}
