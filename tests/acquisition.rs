//! Acquisition behaviour against scripted transports.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use storegate::config::loader::{load_with, report_findings};
use storegate::config::validation::ValidationFinding;
use storegate::resilience::RetryPolicy;
use storegate::store::{AcquireError, ConfigurationError, ConnectError, ConnectionAcquirer, QueryError, StoreError};
use tokio::time::Instant;

mod common;
use common::{complete_config, CapturedLogs, ScriptedConnector};

fn acquirer(connector: ScriptedConnector, policy: RetryPolicy) -> (ConnectionAcquirer, Arc<common::Counters>) {
    let counters = Arc::clone(&connector.counters);
    let acquirer = ConnectionAcquirer::with_connector(complete_config(), policy, Arc::new(connector));
    (acquirer, counters)
}

#[tokio::test(start_paused = true)]
async fn healthy_backend_opens_on_first_attempt() {
    let (acquirer, counters) = acquirer(ScriptedConnector::healthy(), RetryPolicy::default());
    let started = Instant::now();

    let handle = acquirer.acquire().await.expect("acquire failed");

    assert_eq!(handle.attempts(), 1);
    assert_eq!(counters.connects(), 1);
    assert!(started.elapsed() < Duration::from_secs(5), "no retry delay on the happy path");
    handle.release().await;
    assert_eq!(counters.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_cost_one_delay_each() {
    for k in 1..5 {
        let (acquirer, counters) = acquirer(ScriptedConnector::failing(k), RetryPolicy::default());
        let started = Instant::now();

        let handle = acquirer.acquire().await.expect("acquire failed");

        assert_eq!(handle.attempts(), k + 1);
        assert_eq!(counters.connects(), k + 1);
        assert!(started.elapsed() >= Duration::from_secs(5) * k);
        handle.release().await;
    }
}

#[tokio::test(start_paused = true)]
async fn unreachable_backend_exhausts_after_exactly_max_attempts() {
    let (acquirer, counters) = acquirer(ScriptedConnector::failing(u32::MAX), RetryPolicy::default());
    let started = Instant::now();

    let err = acquirer.acquire().await.unwrap_err();

    match &err {
        AcquireError::Exhausted { attempts, last_error } => {
            assert_eq!(*attempts, 5);
            assert!(matches!(last_error, ConnectError::Transport(_)));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert!(err.to_string().starts_with("maximum retry attempts reached"));
    assert_eq!(counters.connects(), 5);
    assert!(started.elapsed() >= Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn hung_attempts_are_bounded_by_connect_timeout() {
    let connector = ScriptedConnector::hanging();
    let counters = Arc::clone(&connector.counters);
    let mut config = complete_config();
    config.connect_timeout_ms = 1_000;
    let policy = RetryPolicy::new(3, Duration::from_millis(500));
    let acquirer = ConnectionAcquirer::with_connector(config, policy, Arc::new(connector));
    let started = Instant::now();

    let err = acquirer.acquire().await.unwrap_err();

    assert!(matches!(
        err,
        AcquireError::Exhausted { attempts: 3, last_error: ConnectError::Timeout(_) }
    ));
    assert_eq!(counters.connects(), 3);
    assert!(started.elapsed() >= Duration::from_millis(3 * 1_000 + 2 * 500));
}

#[tokio::test]
async fn release_on_broken_transport_is_silent() {
    let (acquirer, counters) = acquirer(
        ScriptedConnector::healthy().with_broken_close(),
        RetryPolicy::default(),
    );

    let handle = acquirer.acquire().await.unwrap();
    handle.release().await;

    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn query_error_does_not_release_but_run_once_does() {
    let (acquirer, counters) = acquirer(ScriptedConnector::healthy(), RetryPolicy::default());

    let mut handle = acquirer.acquire().await.unwrap();
    let err = handle.run_query("FAIL now", &[]).await.unwrap_err();
    assert!(matches!(err, QueryError::Database(_)));
    assert_eq!(counters.closes(), 0);
    handle.release().await;
    assert_eq!(counters.closes(), 1);

    let err = acquirer.run_once("FAIL again", &[]).await.unwrap_err();
    assert!(matches!(err, StoreError::Query(_)));
    assert_eq!(counters.closes(), 2);

    let rows = acquirer
        .run_once("SELECT $1", &[Value::from(42)])
        .await
        .unwrap();
    assert_eq!(rows[0]["params"], Value::from(vec![Value::from(42)]));
    assert_eq!(counters.closes(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_acquisitions_are_independent() {
    let (acquirer, counters) = acquirer(ScriptedConnector::healthy(), RetryPolicy::default());
    let acquirer = Arc::new(acquirer);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let acquirer = Arc::clone(&acquirer);
            tokio::spawn(async move {
                let mut handle = acquirer.acquire().await.expect("acquire failed");
                handle.run_query("SELECT 1", &[]).await.expect("query failed");
                let id = handle.id();
                handle.release().await;
                id
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.expect("task panicked"));
    }

    assert_eq!(ids.len(), 16);
    assert_eq!(counters.connects(), 16);
    assert_eq!(counters.closes(), 16);
}

#[tokio::test]
async fn missing_credential_fails_with_configuration_error() {
    let env = |key: &str| match key {
        "DB_USER" => Some("admin".to_string()),
        "DB_HOST" => Some("localhost".to_string()),
        "DB_NAME" => Some("shop".to_string()),
        _ => None,
    };
    let (config, findings) = load_with(None, env).unwrap();
    assert_eq!(findings, vec![ValidationFinding::Missing("database.password")]);

    let logs = CapturedLogs::default();
    logs.capture(|| report_findings(&findings));
    let warnings = logs.warnings();
    assert_eq!(warnings.len(), 1, "{:?}", warnings);
    assert!(warnings[0].contains("database.password"), "{}", warnings[0]);

    let connector = ScriptedConnector::healthy();
    let counters = Arc::clone(&connector.counters);
    let acquirer = ConnectionAcquirer::with_connector(
        config.database.clone(),
        RetryPolicy::from(&config.retries),
        Arc::new(connector),
    );

    let err = acquirer.acquire().await.unwrap_err();
    assert!(matches!(
        err,
        AcquireError::Configuration(ConfigurationError::Missing("database.password"))
    ));
    assert!(err.to_string().contains("database.password"));
    assert_eq!(counters.connects(), 0);
}

#[test]
fn each_missing_field_gets_its_own_warning() {
    let (_, findings) = load_with(None, |_| None).unwrap();

    let logs = CapturedLogs::default();
    logs.capture(|| report_findings(&findings));
    let warnings = logs.warnings();

    assert_eq!(warnings.len(), 4, "{:?}", warnings);
    for field in ["database.user", "database.password", "database.host", "database.database"] {
        let hits = warnings
            .iter()
            .filter(|line| line.contains(&format!("field={}", field)))
            .count();
        assert_eq!(hits, 1, "expected one warning for {}: {:?}", field, warnings);
    }
}
