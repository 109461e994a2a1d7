//! Structured concurrency primitives: `Map`, `All`, `Race`, and `Stream`.
//!
//! All four share the same shape: a [`Workers`] bound on concurrency
//! (defaulting to the host's available parallelism), cooperative
//! cancellation, and a failure-reporting convention that never discards a
//! failure silently — every item that failed is represented in the
//! returned [`Errors`].
//!
//! - [`map`] spawns one task per item and returns results aligned with the
//!   input order, waiting for every in-flight task even after a failure.
//! - [`all`] is `map` without a per-item return value — only success/failure
//!   matters.
//! - [`race`] spawns every task against a shared cancellation token; the
//!   first success cancels the rest.
//! - [`stream`] lazily consumes an input stream and emits results as a
//!   stream, bounding how many items are in flight at once.

pub mod all;
pub mod map;
pub mod race;
pub mod stream;
pub mod work;
pub mod workers;

pub use all::all;
pub use map::map;
pub use race::{race, BoxFuture, RaceTask};
pub use stream::stream;
pub use work::{BoxError, Errors, Failure, WorkResult};
pub use workers::Workers;
