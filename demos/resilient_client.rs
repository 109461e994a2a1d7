//! Resilient outbound HTTP client: retry + circuit breaker + deadline.
//!
//! Run with: cargo run -p tower-resilience --example resilient_client --features client

use std::time::Duration;

use tower_resilience_client::{ClientError, ResilientClient};
use tower_resilience_retry::RetrierConfig;

#[tokio::main]
async fn main() {
    println!("=== Resilient Client Example ===\n");

    println!("--- Scenario 1: Retry past transient 5xxs ---");
    scenario_retry().await;

    println!("\n--- Scenario 2: Circuit breaker trips on a downed dependency ---");
    scenario_circuit_breaker().await;
}

async fn scenario_retry() {
    let client = ResilientClient::builder()
        .name("payments-api")
        .timeout(Duration::from_secs(2))
        .retry(RetrierConfig::new(3, Duration::from_millis(100)))
        .build();

    let request = match reqwest::Client::new()
        .get("http://127.0.0.1:9/payments/health")
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            println!("[Client] could not build request: {e}");
            return;
        }
    };

    match client.execute(request).await {
        Ok(response) => println!("[Client] succeeded with status {}", response.status()),
        Err(ClientError::Timeout) => println!("[Client] deadline exceeded, all retries exhausted"),
        Err(e) => println!("[Client] failed: {e}"),
    }
}

async fn scenario_circuit_breaker() {
    let client = ResilientClient::builder()
        .name("inventory-api")
        .circuit_breaker("inventory-api", 3, Duration::from_secs(30))
        .build();

    for attempt in 1..=5 {
        let request = reqwest::Client::new()
            .get("http://127.0.0.1:9/inventory")
            .build()
            .unwrap();

        match client.execute(request).await {
            Ok(response) => println!("[Client] attempt {attempt} succeeded: {}", response.status()),
            Err(ClientError::CircuitOpen) => {
                println!("[Client] attempt {attempt} rejected — circuit is open, failing fast");
            }
            Err(e) => println!("[Client] attempt {attempt} failed: {e}"),
        }
    }

    println!("\nIn production you would size the threshold and reset timeout to the");
    println!("dependency's actual failure/recovery pattern, and pair this with a");
    println!("fallback or cached response while the breaker is open.");
}
