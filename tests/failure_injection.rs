//! Failure injection tests for the balancer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wrr_balancer::config::ProxyConfig;

mod common;

/// Backend whose `/health` answers 500 while `healthy` is false.
async fn switchable_backend(name: &'static str, healthy: Arc<AtomicBool>) -> std::net::SocketAddr {
    common::start_programmable_backend(move |head| {
        if head.starts_with("HEAD /health") {
            if healthy.load(Ordering::SeqCst) {
                (200, String::new())
            } else {
                (500, "dead".into())
            }
        } else {
            (200, name.into())
        }
    })
    .await
}

fn health_config(servers: Vec<wrr_balancer::config::ServerConfig>) -> ProxyConfig {
    let servers = servers
        .into_iter()
        .map(|mut s| {
            s.health_check_url = Some(s.url.join("/health").unwrap());
            s
        })
        .collect();
    ProxyConfig::new(servers, Duration::from_millis(100))
}

#[tokio::test]
async fn test_health_check_eviction_and_recovery() {
    let b1_healthy = Arc::new(AtomicBool::new(true));
    let b2_healthy = Arc::new(AtomicBool::new(true));
    let b1 = switchable_backend("b1", b1_healthy.clone()).await;
    let b2 = switchable_backend("b2", b2_healthy.clone()).await;

    let config = health_config(vec![common::server(b1, 1), common::server(b2, 1)]);
    let (proxy, shutdown) = common::start_balancer(config).await;
    let client = common::client();

    let mut hits = Vec::new();
    for _ in 0..4 {
        hits.push(common::fetch(&client, proxy, "/").await.unwrap());
    }
    assert_eq!(hits, vec!["b1", "b2", "b1", "b2"]);

    b2_healthy.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;

    for _ in 0..10 {
        assert_eq!(common::fetch(&client, proxy, "/").await.unwrap(), "b1", "b2 should be evicted");
    }

    b2_healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;

    let mut b2_hits = 0;
    for _ in 0..10 {
        if common::fetch(&client, proxy, "/").await.unwrap() == "b2" {
            b2_hits += 1;
        }
    }
    assert_eq!(b2_hits, 5, "recovered b2 should get its share again");

    shutdown.trigger();
}

#[tokio::test]
async fn test_all_targets_down_is_service_unavailable() {
    let healthy = Arc::new(AtomicBool::new(false));
    let b1 = switchable_backend("b1", healthy).await;

    let config = health_config(vec![common::server(b1, 3)]);
    let (proxy, shutdown) = common::start_balancer(config).await;
    let client = common::client();

    tokio::time::sleep(Duration::from_millis(300)).await;

    for _ in 0..3 {
        let res = client.get(format!("http://{}/", proxy)).send().await.unwrap();
        assert_eq!(res.status(), 503);
        assert_eq!(res.text().await.unwrap(), "No available server");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_target_is_bad_gateway() {
    let dead = common::closed_port().await;

    // long interval: the target stays in rotation for the whole test
    let config = ProxyConfig::new(vec![common::server(dead, 1)], Duration::from_secs(3600));
    let (proxy, shutdown) = common::start_balancer(config).await;
    let client = common::client();

    assert_eq!(common::fetch(&client, proxy, "/").await, Err(502));
    assert_eq!(common::fetch(&client, proxy, "/").await, Err(502));

    shutdown.trigger();
}

#[tokio::test]
async fn test_probe_defaults_to_endpoint_url() {
    // no healthCheckUrl: the endpoint itself is probed, and it answers 404
    let b1 = common::start_programmable_backend(|head| {
        if head.starts_with("HEAD ") {
            (404, String::new())
        } else {
            (200, "b1".into())
        }
    })
    .await;
    let b2 = common::start_mock_backend("b2").await;

    let config = ProxyConfig::new(
        vec![common::server(b1, 1), common::server(b2, 1)],
        Duration::from_millis(100),
    );
    let (proxy, shutdown) = common::start_balancer(config).await;
    let client = common::client();

    tokio::time::sleep(Duration::from_millis(300)).await;
    for _ in 0..4 {
        assert_eq!(common::fetch(&client, proxy, "/").await.unwrap(), "b2");
    }

    shutdown.trigger();
}
