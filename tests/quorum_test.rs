//! Confirmation polling across the leading endpoints.

use std::time::{Duration, Instant};
use url::Url;

use tx_relay::config::Commitment;
use tx_relay::delivery::{ConfirmationQuorumChecker, QuorumError};
use tx_relay::health::HealthTracker;
use tx_relay::transport::TransportErrorKind;

mod common;
use common::{at_depth, confirmed, err, executed_with_error, MockCluster, MockNode};

async fn checker(cluster: &MockCluster, timeout: Duration) -> ConfirmationQuorumChecker {
    let urls = cluster
        .config
        .endpoints
        .iter()
        .map(|u| Url::parse(u).unwrap())
        .collect();
    let tracker = HealthTracker::new(urls);
    ConfirmationQuorumChecker::open(&tracker, cluster.factory.as_ref(), timeout).await
}

#[tokio::test]
async fn test_one_of_three_confirmed() {
    let cluster = MockCluster::new(3);
    cluster.nodes[2].set_status(Ok(confirmed()));
    let quorum = checker(&cluster, Duration::from_secs(1)).await;

    assert!(quorum.poll("sig", 3, Commitment::Confirmed).await.unwrap());
    for node in &cluster.nodes {
        assert_eq!(MockNode::count(&node.status_queries), 1);
    }
}

#[tokio::test]
async fn test_unseen_everywhere_is_not_confirmed() {
    let cluster = MockCluster::new(3);
    let quorum = checker(&cluster, Duration::from_secs(1)).await;

    assert!(!quorum.poll("sig", 3, Commitment::Confirmed).await.unwrap());
}

#[tokio::test]
async fn test_definite_failure_returns_without_waiting() {
    let cluster = MockCluster::new(3);
    cluster.nodes[0].set_status_delay(Duration::from_secs(3));
    cluster.nodes[1].set_status(Ok(executed_with_error("InstructionError")));
    let quorum = checker(&cluster, Duration::from_secs(5)).await;

    let started = Instant::now();
    let error = quorum.poll("sig", 3, Commitment::Confirmed).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(1));
    let QuorumError::Definite {
        signature,
        endpoint,
        message,
    } = error;
    assert_eq!(signature, "sig");
    assert_eq!(endpoint, cluster.url(1));
    assert_eq!(message, "InstructionError");
}

#[tokio::test]
async fn test_only_leading_endpoints_are_polled() {
    let cluster = MockCluster::new(4);
    cluster.nodes[3].set_status(Ok(confirmed()));
    let quorum = checker(&cluster, Duration::from_secs(1)).await;

    assert_eq!(quorum.fan_out(2), 2);
    assert_eq!(quorum.fan_out(10), 4);
    assert!(!quorum.poll("sig", 2, Commitment::Confirmed).await.unwrap());
    assert_eq!(MockNode::count(&cluster.nodes[2].status_queries), 0);
    assert_eq!(MockNode::count(&cluster.nodes[3].status_queries), 0);
}

#[tokio::test]
async fn test_unreachable_node_counts_as_unconfirmed() {
    let cluster = MockCluster::new(2);
    cluster.nodes[0].set_status(Err(err(TransportErrorKind::ConnectionRefused, "connection refused")));
    cluster.nodes[1].set_status(Ok(confirmed()));
    let quorum = checker(&cluster, Duration::from_secs(1)).await;

    assert!(quorum.poll("sig", 2, Commitment::Confirmed).await.unwrap());
}

#[tokio::test]
async fn test_slow_node_times_out_as_unconfirmed() {
    let cluster = MockCluster::new(2);
    cluster.nodes[0].set_status_delay(Duration::from_millis(500));
    cluster.nodes[0].set_status(Ok(confirmed()));
    let quorum = checker(&cluster, Duration::from_millis(50)).await;

    let started = Instant::now();
    assert!(!quorum.poll("sig", 2, Commitment::Confirmed).await.unwrap());
    assert!(started.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
async fn test_unopenable_endpoint_is_skipped() {
    let cluster = MockCluster::new(2);
    cluster.nodes[0].set_fail_open(true);
    cluster.nodes[1].set_status(Ok(confirmed()));
    let quorum = checker(&cluster, Duration::from_secs(1)).await;

    assert!(quorum.poll("sig", 2, Commitment::Confirmed).await.unwrap());
    assert_eq!(MockNode::count(&cluster.nodes[0].status_queries), 0);
}

#[tokio::test]
async fn test_status_below_target_depth_is_not_confirmed() {
    let cluster = MockCluster::new(2);
    cluster.nodes[0].set_status(Ok(at_depth(Commitment::Processed)));
    cluster.nodes[1].set_status(Ok(confirmed()));
    let quorum = checker(&cluster, Duration::from_secs(1)).await;

    assert!(quorum.poll("sig", 2, Commitment::Confirmed).await.unwrap());
    assert!(!quorum.poll("sig", 2, Commitment::Finalized).await.unwrap());
    assert!(quorum.poll("sig", 1, Commitment::Processed).await.unwrap());
}
