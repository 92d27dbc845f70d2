//! Ordered, thread-safe middleware registry.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use crate::transport::Interceptor;

/// Middleware registered on a client, in call order.
///
/// Appends take the write lock; every dispatch copies the contents under the
/// read lock, so a request never sees a half-appended batch nor any append
/// made after its snapshot was taken.
#[derive(Default)]
pub(crate) struct Chain {
    entries: RwLock<Vec<Interceptor>>,
}

impl Chain {
    pub(crate) fn new(entries: Vec<Interceptor>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Add `batch` at the end, atomically.
    pub(crate) fn append(&self, batch: impl IntoIterator<Item = Interceptor>) {
        // collect first: the lock must not be held while user iterators run
        let batch: Vec<_> = batch.into_iter().collect();
        if batch.is_empty() {
            return;
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(batch);
    }

    /// Independent copy of the current contents.
    pub(crate) fn snapshot(&self) -> Vec<Interceptor> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A new registry starting with the same entries.
    pub(crate) fn fork(&self) -> Self {
        Self::new(self.snapshot())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::transport::BoxedService;

    fn identity() -> Interceptor {
        Arc::new(|next: BoxedService| next)
    }

    #[test]
    fn append_keeps_order_and_duplicates() {
        let shared = identity();
        let chain = Chain::default();
        chain.append([Arc::clone(&shared), Arc::clone(&shared)]);
        chain.append([identity()]);

        let snapshot = chain.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(Arc::ptr_eq(&snapshot[0], &shared));
        assert!(Arc::ptr_eq(&snapshot[1], &shared));
        assert!(!Arc::ptr_eq(&snapshot[2], &shared));
    }

    #[test]
    fn snapshot_is_independent_of_later_appends() {
        let chain = Chain::default();
        chain.append([identity()]);

        let snapshot = chain.snapshot();
        chain.append([identity(), identity()]);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn fork_is_independent() {
        let chain = Chain::default();
        chain.append([identity()]);

        let forked = chain.fork();
        forked.append([identity()]);
        chain.append([identity(), identity()]);

        assert_eq!(forked.len(), 2);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn readers_never_see_partial_batches() {
        const BATCH: usize = 4;
        let chain = Arc::new(Chain::default());

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let chain = Arc::clone(&chain);
                thread::spawn(move || {
                    for _ in 0..50 {
                        chain.append((0..BATCH).map(|_| identity()));
                    }
                })
            })
            .collect();

        let reader = {
            let chain = Arc::clone(&chain);
            thread::spawn(move || {
                for _ in 0..500 {
                    assert_eq!(chain.snapshot().len() % BATCH, 0);
                }
            })
        };

        for writer in writers {
            writer.join().expect("writer");
        }
        reader.join().expect("reader");
        assert_eq!(chain.len(), 4 * 50 * BATCH);
    }
}
