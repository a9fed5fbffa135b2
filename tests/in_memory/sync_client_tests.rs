//! Startup, discovery and invocation through the synchronous client.

use super::helpers::{
    TestClient, client_for, config_for, defaults_operation, echo_operation, fast_options,
    provider_name, reporting_provider,
};
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use toolbridge::bridge::{
    adapters::{InMemoryProvider, InMemoryProviderConnector},
    domain::{CallArguments, ClientLifecycleState, ClientOptions, RemoteOperation, SchemaError},
    ports::ProviderSessionError,
    services::{SyncClientError, SyncToolClient, UsageError},
};

fn started(providers: Vec<InMemoryProvider>, options: ClientOptions) -> TestClient {
    let mut client = client_for(providers, options).expect("client should build");
    client.start().expect("client should start");
    client
}

#[rstest]
fn adapter_count_matches_discovered_operations(fast_options: ClientOptions) {
    let files = reporting_provider(
        "files",
        vec![echo_operation("read_file"), echo_operation("write_file")],
    );
    let search = reporting_provider("search", vec![defaults_operation("query")]);

    let client = started(vec![files, search], fast_options);

    let ids: Vec<&str> = client
        .adapters()
        .iter()
        .map(|adapter| adapter.id().as_str())
        .collect();
    assert_eq!(ids, vec!["files__read_file", "files__write_file", "search__query"]);
    assert_eq!(client.state(), ClientLifecycleState::Active);
}

#[rstest]
fn startup_names_the_first_failing_provider(fast_options: ClientOptions) {
    let healthy = reporting_provider("healthy", vec![echo_operation("ping")]);
    let broken = reporting_provider("broken", vec![echo_operation("ping")])
        .failing_connect("handshake refused");
    let later = reporting_provider("later", vec![echo_operation("ping")])
        .failing_connect("also broken");
    let healthy_probe = healthy.clone();
    let later_probe = later.clone();
    let mut client =
        client_for(vec![healthy, broken, later], fast_options).expect("client should build");

    let result = client.start();

    assert!(matches!(
        result,
        Err(SyncClientError::Startup { ref provider, source: ProviderSessionError::Protocol { .. } })
            if provider.as_str() == "broken"
    ));
    assert_eq!(client.state(), ClientLifecycleState::Closed);
    assert!(client.adapters().is_empty());
    assert!(!healthy_probe.is_connected().expect("state readable"));
    assert_eq!(healthy_probe.disconnect_attempts().expect("state readable"), 1);
    assert_eq!(later_probe.disconnect_attempts().expect("state readable"), 0);
}

#[rstest]
fn unregistered_provider_fails_startup(fast_options: ClientOptions) {
    let result = SyncToolClient::connect(
        config_for(&["ghost"], fast_options),
        Arc::new(InMemoryProviderConnector::new()),
        Arc::new(DefaultClock),
    );

    assert!(matches!(
        result,
        Err(SyncClientError::Startup { ref provider, source: ProviderSessionError::Spawn { .. } })
            if provider.as_str() == "ghost"
    ));
}

#[rstest]
fn unsupported_schema_aborts_startup(fast_options: ClientOptions) {
    let composed = RemoteOperation::new("composed", "", json!({"allOf": [{"type": "object"}]}))
        .expect("valid operation");
    let files = reporting_provider("files", vec![echo_operation("read_file"), composed]);
    let probe = files.clone();
    let mut client = client_for(vec![files], fast_options).expect("client should build");

    let result = client.start();

    assert!(matches!(
        result,
        Err(SyncClientError::Configuration {
            ref provider,
            ref operation,
            source: SchemaError::UnsupportedComposition(_),
        }) if provider.as_str() == "files" && operation == "composed"
    ));
    assert!(!probe.is_connected().expect("state readable"));
}

#[rstest]
fn colliding_adapter_ids_abort_startup(fast_options: ClientOptions) {
    let first = reporting_provider("alpha", vec![echo_operation("b__c")]);
    let second = reporting_provider("alpha__b", vec![echo_operation("c")]);
    let mut client = client_for(vec![first, second], fast_options).expect("client should build");

    let result = client.start();

    assert!(matches!(
        result,
        Err(SyncClientError::DuplicateAdapter(ref id)) if id.as_str() == "alpha__b__c"
    ));
}

#[rstest]
fn optional_only_operation_is_callable_without_arguments(fast_options: ClientOptions) {
    let catalog = reporting_provider("catalog", vec![defaults_operation("list")]);
    let probe = catalog.clone();
    let client = started(vec![catalog], fast_options);

    let result = client
        .call("catalog__list", CallArguments::new())
        .expect("call should succeed");

    assert_eq!(result["arguments"], json!({"page": 1, "size": 25}));
    let received = probe.invocations("list").expect("state readable");
    assert_eq!(received.len(), 1);
    assert_eq!(
        received.first().map(|arguments| arguments.keys().cloned().collect::<Vec<_>>()),
        Some(vec!["page".to_owned(), "size".to_owned()])
    );
}

#[rstest]
fn same_operation_name_on_two_providers_yields_distinct_adapters(fast_options: ClientOptions) {
    let alpha = reporting_provider("alpha", vec![echo_operation("fetch")]);
    let beta = reporting_provider("beta", vec![echo_operation("fetch")]);
    let client = started(vec![alpha, beta], fast_options);

    let from_alpha = client
        .adapter("alpha__fetch")
        .expect("alpha adapter")
        .call(CallArguments::new().named("text", "a"))
        .expect("alpha call should succeed");
    let from_beta = client
        .adapter("beta__fetch")
        .expect("beta adapter")
        .call(CallArguments::new().named("text", "b"))
        .expect("beta call should succeed");

    assert_eq!(from_alpha["provider"], "alpha");
    assert_eq!(from_beta["provider"], "beta");
}

#[rstest]
fn missing_required_argument_sends_nothing(fast_options: ClientOptions) {
    let files = reporting_provider("files", vec![echo_operation("read_file")]);
    let probe = files.clone();
    let client = started(vec![files], fast_options);

    let result = client.call("files__read_file", CallArguments::new());

    assert!(matches!(result, Err(SyncClientError::Call(_))));
    assert_eq!(probe.invocation_count().expect("state readable"), 0);
}

#[rstest]
fn provider_errors_reach_the_caller_unchanged(fast_options: ClientOptions) {
    let flaky = InMemoryProvider::new(provider_name("flaky")).with_operation(
        echo_operation("ping"),
        |_| {
            Err(ProviderSessionError::Remote {
                code: 42,
                message: "upstream unavailable".to_owned(),
                data: Some(Box::new(json!({"retry_after": 5}))),
            })
        },
    );
    let client = started(vec![flaky], fast_options);

    let result = client.call("flaky__ping", CallArguments::new().arg("hello"));

    let error = match result {
        Err(SyncClientError::Call(error)) => error,
        other => panic!("expected call error, got {other:?}"),
    };
    assert_eq!(
        error.to_string(),
        "provider error [42]: upstream unavailable"
    );
}

#[rstest]
fn unknown_adapter_is_reported(fast_options: ClientOptions) {
    let files = reporting_provider("files", vec![echo_operation("read_file")]);
    let client = started(vec![files], fast_options);

    assert!(client.adapter("files__delete").is_none());
    assert!(matches!(
        client.call("files__delete", CallArguments::new()),
        Err(SyncClientError::UnknownAdapter(ref id)) if id == "files__delete"
    ));
}

#[rstest]
fn provider_status_snapshot_lists_connected_providers(fast_options: ClientOptions) {
    let files = reporting_provider("files", vec![echo_operation("a"), echo_operation("b")]);
    let empty = reporting_provider("empty", Vec::new());
    let client = started(vec![files, empty], fast_options);

    let statuses: Vec<(&str, usize, &str)> = client
        .providers()
        .iter()
        .map(|status| {
            (
                status.name().as_str(),
                status.operation_count(),
                status.transport_kind(),
            )
        })
        .collect();

    assert_eq!(statuses, vec![("files", 2, "stdio"), ("empty", 0, "stdio")]);
}

#[rstest]
fn calls_before_start_are_usage_errors(fast_options: ClientOptions) {
    let files = reporting_provider("files", vec![echo_operation("read_file")]);
    let client = client_for(vec![files], fast_options).expect("client should build");

    assert!(client.adapters().is_empty());
    assert!(matches!(
        client.call("files__read_file", CallArguments::new().arg("x")),
        Err(SyncClientError::Usage(UsageError::InvalidState {
            operation: "call",
            state: ClientLifecycleState::Unstarted,
        }))
    ));
}

#[rstest]
fn starting_twice_is_a_usage_error(fast_options: ClientOptions) {
    let files = reporting_provider("files", vec![echo_operation("read_file")]);
    let mut client = started(vec![files], fast_options);

    assert!(matches!(
        client.start(),
        Err(SyncClientError::Usage(UsageError::InvalidState {
            operation: "start",
            state: ClientLifecycleState::Active,
        }))
    ));
}

#[rstest]
fn dropping_an_active_client_disconnects_providers(fast_options: ClientOptions) {
    let files = reporting_provider("files", vec![echo_operation("read_file")]);
    let probe = files.clone();
    let client = started(vec![files], fast_options);
    assert!(probe.is_connected().expect("state readable"));

    drop(client);

    assert!(!probe.is_connected().expect("state readable"));
    assert_eq!(probe.disconnect_attempts().expect("state readable"), 1);
}
