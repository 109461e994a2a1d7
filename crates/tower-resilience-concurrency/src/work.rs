use std::error::Error as StdError;
use std::fmt;

/// A boxed, type-erased error as produced by a failed work item.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A single failure observed while running a batch of work, tagged with the
/// input index it came from.
#[derive(Debug)]
pub struct Failure {
    /// The index of the item that failed, in original input order.
    pub index: usize,
    /// The error the item's work returned.
    pub error: BoxError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.error)
    }
}

/// Aggregates every failure observed from a batch of concurrent work.
///
/// Unlike a first-error-wins result, `Errors` never discards a failure: every
/// item that failed is represented, in the order its task completed.
#[derive(Debug, Default)]
pub struct Errors {
    /// The failures collected so far.
    pub failures: Vec<Failure>,
}

impl Errors {
    /// `true` if no failures were recorded.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// The number of failures recorded.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Wraps `failures` into an `Errors`, or returns `None` if empty —
    /// the idiom every primitive in this crate uses to decide whether it
    /// failed at all.
    pub fn from_failures(failures: Vec<Failure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} task(s) failed: ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl StdError for Errors {}

/// One item's outcome from [`crate::stream`], tagged with its producer-order
/// index.
#[derive(Debug)]
pub struct WorkResult<R, E> {
    /// The order this item was received from the input, zero-indexed.
    pub index: usize,
    /// The item's outcome.
    pub result: Result<R, E>,
}
