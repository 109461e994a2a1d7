//! Running a set of long-lived components under one signal-aware lifecycle.
//!
//! Run with: cargo run -p tower-resilience --example service_lifecycle --features lifecycle

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tower_resilience_lifecycle::{Component, Lifecycle};

#[tokio::main]
async fn main() {
    println!("=== Service Lifecycle Example ===\n");

    let lifecycle = Lifecycle::builder()
        .on_component_exited(|name, failed| {
            println!("[Lifecycle] '{name}' exited (failed={failed})");
        })
        .on_signal(|signal| {
            println!("[Lifecycle] received {signal}, shutting every component down");
        })
        .build();

    let components = vec![
        Component::new("http_server", |cancel| async move {
            println!("[http_server] listening");
            cancel.cancelled().await;
            println!("[http_server] draining in-flight requests");
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<(), std::io::Error>(())
        }),
        Component::new("background_worker", |cancel| async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        println!("[background_worker] stopping");
                        return Ok::<(), std::io::Error>(());
                    }
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {
                        println!("[background_worker] tick");
                    }
                }
            }
        }),
    ];

    // In a real service this token is never cancelled directly; the
    // lifecycle cancels its own derived token on SIGTERM/SIGINT or when any
    // component returns an error. Cancel it here so the example exits.
    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        shutdown.cancel();
    });

    match lifecycle.run(token, components).await {
        Ok(()) => println!("\n[Lifecycle] every component shut down cleanly"),
        Err(e) => println!("\n[Lifecycle] '{}' failed: {}", e.component_name(), e),
    }
}
