use std::sync::atomic::{AtomicUsize, Ordering};

/// Query counters tracked atomically across workers
#[derive(Debug)]
pub struct QueryProgress {
    done: AtomicUsize,
    total: usize,
    every: usize,
    enabled: bool,
}

impl QueryProgress {
    pub fn new(total: usize, every: usize, enabled: bool) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
            every: every.max(1),
            enabled,
        }
    }

    /// Count one finished query; reports every `every` queries and at the end
    pub fn tick(&self, worker_id: usize) -> usize {
        let current = self.done.fetch_add(1, Ordering::Relaxed) + 1;

        if self.enabled && (current % self.every == 0 || current == self.total) {
            tracing::info!(
                "⚡ Progress: {}/{} queries ({:.1}%) [worker-{}]",
                current,
                self.total,
                current as f64 / self.total.max(1) as f64 * 100.0,
                worker_id
            );
        }

        current
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}
