//! Command batches over a fake shell session.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;

use metalctl::application::services::remote_exec::run_batch;
use metalctl::domain::{BatchOutcome, CommandBatch, SessionError};

use crate::mocks::{FakeConnector, VALID_KEY, target};

#[tokio::test]
async fn outputs_are_trimmed_and_keyed_by_command() {
    let connector = FakeConnector::new().output("A\n", 0).output("B\n", 0);
    let log = connector.log();

    let outcome = run_batch(
        &connector,
        &target(VALID_KEY),
        &CommandBatch::new(["echo A", "echo B"]),
    )
    .await;

    assert!(outcome.is_complete());
    let expected: BTreeMap<String, String> = [
        ("echo A".to_string(), "A".to_string()),
        ("echo B".to_string(), "B".to_string()),
    ]
    .into();
    assert_eq!(outcome.by_command(), expected);
    let log = log.lock().unwrap();
    assert_eq!(log.connects, 1);
    assert!(log.closed);
}

#[tokio::test]
async fn failing_command_does_not_stop_the_batch() {
    let connector = FakeConnector::new()
        .output("first\n", 0)
        .failure("no such file\n", 2)
        .output("third\n", 0);
    let log = connector.log();

    let outcome = run_batch(
        &connector,
        &target(VALID_KEY),
        &CommandBatch::new(["echo first", "cat /missing", "echo third"]),
    )
    .await;

    let BatchOutcome::Complete(results) = &outcome else {
        panic!("expected complete, got {outcome:?}");
    };
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].stdout, "first");
    assert_eq!(results[1].exit_code, Some(2));
    assert_eq!(results[1].stdout, "");
    assert!(!results[1].succeeded());
    assert_eq!(results[2].stdout, "third");
    assert_eq!(log.lock().unwrap().executed.len(), 3);
}

#[tokio::test]
async fn timed_out_command_is_recorded_and_batch_continues() {
    let connector = FakeConnector::new()
        .timed_out()
        .output("after\n", 0);
    let log = connector.log();

    let outcome = run_batch(
        &connector,
        &target(VALID_KEY),
        &CommandBatch::new(["sleep 900", "echo after"]),
    )
    .await;

    let BatchOutcome::Complete(results) = &outcome else {
        panic!("expected complete, got {outcome:?}");
    };
    assert_eq!(results[0].exit_code, None);
    assert!(!results[0].succeeded());
    assert_eq!(results[1].stdout, "after");
    assert_eq!(log.lock().unwrap().executed.len(), 2);
}

#[tokio::test]
async fn malformed_key_yields_no_results_and_no_connection() {
    let connector = FakeConnector::new();
    let log = connector.log();

    let outcome = run_batch(
        &connector,
        &target("not a key"),
        &CommandBatch::new(["uname -a"]),
    )
    .await;

    assert!(matches!(outcome, BatchOutcome::AuthFailed(_)));
    assert!(outcome.results().is_empty());
    assert!(outcome.by_command().is_empty());
    assert_eq!(log.lock().unwrap().connects, 0);
}

#[tokio::test]
async fn rejected_key_is_auth_failure() {
    let connector = FakeConnector::refusing(SessionError::Authentication(
        "Permission denied (publickey)".into(),
    ));

    let outcome = run_batch(&connector, &target(VALID_KEY), &CommandBatch::new(["id"])).await;

    assert_eq!(outcome.kind(), "auth_failed");
    assert!(outcome.results().is_empty());
}

#[tokio::test]
async fn unreachable_host_is_connect_failure() {
    let connector = FakeConnector::refusing(SessionError::Connect("timed out".into()));

    let outcome = run_batch(&connector, &target(VALID_KEY), &CommandBatch::new(["id"])).await;

    assert_eq!(outcome, BatchOutcome::ConnectFailed("cannot connect: timed out".into()));
}

#[tokio::test]
async fn broken_session_keeps_earlier_results_and_closes() {
    let connector = FakeConnector::new()
        .output("one\n", 0)
        .broken("connection reset");
    let log = connector.log();

    let outcome = run_batch(
        &connector,
        &target(VALID_KEY),
        &CommandBatch::new(["echo one", "echo two", "echo three"]),
    )
    .await;

    let BatchOutcome::Partial {
        results,
        failed_at,
        reason,
    } = &outcome
    else {
        panic!("expected partial, got {outcome:?}");
    };
    assert_eq!(results.len(), 1);
    assert_eq!(*failed_at, 1);
    assert!(reason.contains("connection reset"));
    let log = log.lock().unwrap();
    assert_eq!(log.executed, ["echo one", "echo two"]);
    assert!(log.closed);
}

#[tokio::test]
async fn repeated_command_keeps_every_result() {
    let connector = FakeConnector::new().output("1\n", 0).output("2\n", 0);

    let outcome = run_batch(
        &connector,
        &target(VALID_KEY),
        &CommandBatch::new(["date +%s", "date +%s"]),
    )
    .await;

    assert_eq!(outcome.results().len(), 2);
    assert_eq!(outcome.results()[1].index, 1);
    // The command-keyed view keeps only the last one.
    assert_eq!(outcome.by_command()["date +%s"], "2");
}

#[tokio::test]
async fn empty_batch_completes_without_commands() {
    let connector = FakeConnector::new();
    let log = connector.log();

    let outcome = run_batch(&connector, &target(VALID_KEY), &CommandBatch::default()).await;

    assert_eq!(outcome, BatchOutcome::Complete(Vec::new()));
    assert!(log.lock().unwrap().closed);
}
