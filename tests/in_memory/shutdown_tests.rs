//! Closing a client: teardown reports, bounds and post-close usage.

use super::helpers::{
    TestClient, client_for, config_for, echo_operation, fast_options, reporting_provider,
};
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use toolbridge::bridge::{
    adapters::{InMemoryProvider, InMemoryProviderConnector},
    domain::{CallArguments, ClientLifecycleState, ClientOptions, ProviderConfig, RemoteOperation},
    ports::{ProviderConnector, ProviderSession, ProviderSessionError, ProviderSessionResult},
    services::{AdapterCallError, SchedulerError, SyncClientError, SyncToolClient, UsageError},
};

/// Session that connects like its inner provider but panics on disconnect.
struct PanickingDisconnect(InMemoryProvider);

#[async_trait]
impl ProviderSession for PanickingDisconnect {
    async fn connect(&self) -> ProviderSessionResult<Vec<RemoteOperation>> {
        self.0.connect().await
    }

    async fn invoke(
        &self,
        operation: &str,
        arguments: Map<String, Value>,
    ) -> ProviderSessionResult<Value> {
        self.0.invoke(operation, arguments).await
    }

    async fn disconnect(&self) -> ProviderSessionResult<()> {
        panic!("disconnect exploded");
    }
}

/// Serves one provider through [`PanickingDisconnect`] and the rest as is.
struct PanickingConnector {
    panicking: String,
    inner: InMemoryProviderConnector,
}

impl ProviderConnector for PanickingConnector {
    fn open(&self, config: &ProviderConfig) -> ProviderSessionResult<Arc<dyn ProviderSession>> {
        if config.name().as_str() != self.panicking {
            return self.inner.open(config);
        }
        let provider = self
            .inner
            .provider(config.name())
            .cloned()
            .ok_or_else(|| ProviderSessionError::NotConnected(config.name().clone()))?;
        Ok(Arc::new(PanickingDisconnect(provider)))
    }
}

#[rstest]
fn clean_close_disconnects_every_provider(fast_options: ClientOptions) {
    let files = reporting_provider("files", vec![echo_operation("read_file")]);
    let search = reporting_provider("search", vec![echo_operation("query")]);
    let probes = [files.clone(), search.clone()];
    let mut client = client_for(vec![files, search], fast_options).expect("client should build");
    client.start().expect("client should start");

    let report = client.close().expect("close should succeed");

    assert!(report.is_clean());
    let disconnected: Vec<&str> = report
        .disconnected()
        .iter()
        .map(|name| name.as_str())
        .collect();
    assert_eq!(disconnected, vec!["files", "search"]);
    assert_eq!(client.state(), ClientLifecycleState::Closed);
    assert!(client.adapters().is_empty());
    assert!(client.providers().is_empty());
    for probe in probes {
        assert!(!probe.is_connected().expect("state readable"));
    }
}

#[rstest]
fn failing_disconnect_is_recorded_and_the_sweep_continues(fast_options: ClientOptions) {
    let stubborn = reporting_provider("stubborn", vec![echo_operation("ping")])
        .failing_disconnect("socket already gone");
    let polite = reporting_provider("polite", vec![echo_operation("ping")]);
    let polite_probe = polite.clone();
    let mut client = client_for(vec![stubborn, polite], fast_options).expect("client should build");
    client.start().expect("client should start");

    let started = Instant::now();
    let report = client.close().expect("close should complete");

    assert!(started.elapsed() < Duration::from_secs(2));
    let failure = report.failures().first().expect("one failure recorded");
    assert_eq!(report.failures().len(), 1);
    assert_eq!(failure.provider.as_str(), "stubborn");
    assert!(matches!(failure.error, ProviderSessionError::Protocol { .. }));
    assert_eq!(polite_probe.disconnect_attempts().expect("state readable"), 1);
    assert_eq!(report.disconnected().len(), 1);
}

#[rstest]
fn hung_disconnect_is_bounded_by_the_disconnect_timeout(fast_options: ClientOptions) {
    let hung = reporting_provider("hung", vec![echo_operation("ping")])
        .with_disconnect_delay(Duration::from_secs(30));
    let mut client = client_for(vec![hung], fast_options).expect("client should build");
    client.start().expect("client should start");

    let started = Instant::now();
    let report = client.close().expect("close should complete");

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(
        report.failures().first().map(|failure| &failure.error),
        Some(ProviderSessionError::Timeout { phase: "disconnect", .. })
    ));
}

#[rstest]
fn retained_adapter_fails_fast_after_close(fast_options: ClientOptions) {
    let files = reporting_provider("files", vec![echo_operation("read_file")]);
    let probe = files.clone();
    let mut client = client_for(vec![files], fast_options).expect("client should build");
    client.start().expect("client should start");
    let adapter = client
        .adapter("files__read_file")
        .expect("adapter should exist")
        .clone();
    client.close().expect("close should succeed");

    let started = Instant::now();
    let result = adapter.call(CallArguments::new().arg("notes.txt"));

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(matches!(
        result,
        Err(AdapterCallError::Scheduler(SchedulerError::Usage(
            UsageError::SchedulerStopped
        )))
    ));
    assert_eq!(probe.invocation_count().expect("state readable"), 0);
}

#[rstest]
fn client_calls_after_close_are_usage_errors(fast_options: ClientOptions) {
    let files = reporting_provider("files", vec![echo_operation("read_file")]);
    let mut client = client_for(vec![files], fast_options).expect("client should build");
    client.start().expect("client should start");
    client.close().expect("close should succeed");

    assert!(matches!(
        client.call("files__read_file", CallArguments::new().arg("x")),
        Err(SyncClientError::Usage(UsageError::InvalidState {
            operation: "call",
            state: ClientLifecycleState::Closed,
        }))
    ));
    assert!(matches!(
        client.close(),
        Err(SyncClientError::Usage(UsageError::InvalidState {
            operation: "close",
            ..
        }))
    ));
    assert!(matches!(
        client.start(),
        Err(SyncClientError::Usage(UsageError::InvalidState {
            operation: "start",
            ..
        }))
    ));
}

#[rstest]
fn close_before_start_is_a_usage_error(fast_options: ClientOptions) {
    let files = reporting_provider("files", vec![echo_operation("read_file")]);
    let mut client = client_for(vec![files], fast_options).expect("client should build");

    assert!(matches!(
        client.close(),
        Err(SyncClientError::Usage(UsageError::InvalidState {
            operation: "close",
            state: ClientLifecycleState::Unstarted,
        }))
    ));
}

#[rstest]
fn panicking_disconnect_is_recorded_and_later_providers_still_disconnect(
    fast_options: ClientOptions,
) {
    let first = reporting_provider("first", vec![echo_operation("ping")]);
    let second = reporting_provider("second", vec![echo_operation("ping")]);
    let second_probe = second.clone();
    let connector = PanickingConnector {
        panicking: "first".to_owned(),
        inner: InMemoryProviderConnector::new()
            .with_provider(first)
            .with_provider(second),
    };
    let mut client: TestClient = SyncToolClient::new(
        config_for(&["first", "second"], fast_options),
        Arc::new(connector),
        Arc::new(DefaultClock),
    )
    .expect("client should build");
    client.start().expect("client should start");

    let report = client.close().expect("close should complete");

    assert!(!report.is_clean());
    let failed: Vec<&str> = report
        .failures()
        .iter()
        .map(|failure| failure.provider.as_str())
        .collect();
    assert_eq!(failed, vec!["first"]);
    assert!(matches!(
        report.failures().first().map(|failure| &failure.error),
        Some(ProviderSessionError::Runtime(_))
    ));
    let disconnected: Vec<&str> = report
        .disconnected()
        .iter()
        .map(|name| name.as_str())
        .collect();
    assert_eq!(disconnected, vec!["second"]);
    assert_eq!(second_probe.disconnect_attempts().expect("state readable"), 1);
    assert!(!second_probe.is_connected().expect("state readable"));
}

#[rstest]
fn dropping_an_active_client_inside_a_runtime_stops_the_scheduler(fast_options: ClientOptions) {
    let files = reporting_provider("files", vec![echo_operation("read_file")]);
    let mut client = client_for(vec![files], fast_options).expect("client should build");
    client.start().expect("client should start");
    let adapter = client
        .adapter("files__read_file")
        .expect("adapter should exist")
        .clone();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime should build");

    runtime.block_on(async move { drop(client) });

    assert!(matches!(
        adapter.call(CallArguments::new().arg("notes.txt")),
        Err(AdapterCallError::Scheduler(SchedulerError::Usage(
            UsageError::SchedulerStopped
        )))
    ));
}
