//! Load testing for the gateway and its request counters.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use request_gateway::GatewayServer;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_concurrent_requests_are_counted_exactly() {
    let backend = common::closed_port().await;
    let server = GatewayServer::new(&common::gateway_config(backend)).unwrap();
    let counters = server.state().counters.clone();
    let router = server.into_router();

    let handles: Vec<_> = (0..1000)
        .map(|_| {
            let router = router.clone();
            tokio::spawn(async move {
                let request = Request::get("/health").body(Body::empty()).unwrap();
                router.oneshot(request).await.unwrap().status()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(counters.get("/health", "GET"), 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_load_performance() {
    let backend = common::start_echo_backend("primary").await;
    let mut config = common::gateway_config(backend);
    config.breaker.commands.insert(
        "gateway".into(),
        request_gateway::config::CommandConfig {
            max_concurrent: 1000,
            ..Default::default()
        },
    );
    let (gateway, state, shutdown) = common::start_gateway(config).await;

    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;
    let client = common::http_client();

    let start = Instant::now();
    let mut handles = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{}/load", gateway);
        handles.push(tokio::spawn(async move {
            let mut successes = 0;
            for _ in 0..requests_per_task {
                if let Ok(resp) = client.post(&url).body("ping").send().await {
                    if resp.status().is_success() {
                        successes += 1;
                    }
                }
            }
            successes
        }));
    }

    let mut success_count = 0;
    for handle in handles {
        success_count += handle.await.unwrap();
    }
    let duration = start.elapsed();

    println!("Load Test Results:");
    println!("  Total Requests: {}", total_requests);
    println!("  Successful:     {}", success_count);
    println!("  Duration:       {:?}", duration);
    println!(
        "  Throughput:     {:.2} req/s",
        total_requests as f64 / duration.as_secs_f64()
    );

    assert_eq!(success_count, total_requests);
    assert_eq!(state.counters.get("/load", "POST"), total_requests as u64);
    assert!(duration < Duration::from_secs(30));

    shutdown.trigger();
}
