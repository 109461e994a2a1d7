//! Signal-aware lifecycle orchestration for a set of long-running
//! components.
//!
//! [`Lifecycle::run`] derives a cancellable context from the caller's,
//! additionally wired to OS termination signals, launches every
//! [`Component`] concurrently, and cancels the shared context the moment
//! any component fails so its peers can wind down. It waits for every
//! component to finish and returns the first error observed.
//!
//! ```
//! use tower_resilience_lifecycle::{Component, Lifecycle};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let lifecycle = Lifecycle::builder()
//!     .on_component_exited(|name, failed| {
//!         println!("{name} exited (failed={failed})");
//!     })
//!     .build();
//!
//! let components = vec![
//!     Component::new("worker", |cancel| async move {
//!         cancel.cancelled().await;
//!         Ok::<(), std::io::Error>(())
//!     }),
//! ];
//!
//! let token = CancellationToken::new();
//! token.cancel(); // pretend shutdown was requested immediately
//! let _ = lifecycle.run(token, components).await;
//! # }
//! ```

mod component;
mod error;
mod events;
mod runner;
mod signal;

pub use component::Component;
pub use error::ComponentError;
pub use events::LifecycleEvent;
pub use runner::{Lifecycle, LifecycleConfigBuilder};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn all_components_complete_without_error() {
        let lifecycle = Lifecycle::builder().build();
        let components = vec![
            Component::new("a", |cancel| async move {
                cancel.cancelled().await;
                Ok::<(), std::io::Error>(())
            }),
            Component::new("b", |cancel| async move {
                cancel.cancelled().await;
                Ok::<(), std::io::Error>(())
            }),
        ];

        let token = CancellationToken::new();
        let t = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            t.cancel();
        });

        let result = lifecycle.run(token, components).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn first_error_cancels_peers() {
        let peer_observed_cancel = Arc::new(AtomicUsize::new(0));
        let peer_flag = Arc::clone(&peer_observed_cancel);

        let lifecycle = Lifecycle::builder().build();
        let components = vec![
            Component::new("failing", |_cancel| async move {
                Err::<(), _>(std::io::Error::other("boom"))
            }),
            Component::new("peer", move |cancel| {
                let flag = peer_flag;
                async move {
                    cancel.cancelled().await;
                    flag.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), std::io::Error>(())
                }
            }),
        ];

        let result = lifecycle.run(CancellationToken::new(), components).await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().component_name(), "failing");
        assert_eq!(peer_observed_cancel.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn component_exited_events_fire_for_every_component() {
        let exits = Arc::new(std::sync::Mutex::new(Vec::new()));
        let e = Arc::clone(&exits);

        let lifecycle = Lifecycle::builder()
            .on_component_exited(move |name, failed| {
                e.lock().unwrap().push((name.to_string(), failed));
            })
            .build();

        let components = vec![
            Component::new("ok", |_cancel| async move { Ok::<(), std::io::Error>(()) }),
            Component::new("err", |_cancel| async move {
                Err::<(), _>(std::io::Error::other("bad"))
            }),
        ];

        let _ = lifecycle.run(CancellationToken::new(), components).await;

        let recorded = exits.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert!(recorded.contains(&("ok".to_string(), false)));
        assert!(recorded.contains(&("err".to_string(), true)));
    }
}
