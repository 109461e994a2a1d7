/// Bounds the number of tasks a concurrency primitive runs at once.
///
/// The default is the host's available parallelism. A non-positive value is
/// clamped to 1 — a worker count of zero would mean the primitive never
/// makes progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workers(pub(crate) usize);

impl Workers {
    /// Bounds concurrency to exactly `n` tasks. `n <= 0` is clamped to 1.
    pub fn new(n: i64) -> Self {
        Self(n.max(1) as usize)
    }

    /// The effective worker count.
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for Workers {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self(n)
    }
}

impl From<usize> for Workers {
    fn from(n: usize) -> Self {
        Self(n.max(1))
    }
}
