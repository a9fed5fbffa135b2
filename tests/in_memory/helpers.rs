//! Shared fixtures for in-memory synchronous client integration tests.

use mockable::DefaultClock;
use rstest::fixture;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use toolbridge::bridge::{
    adapters::{InMemoryProvider, InMemoryProviderConnector},
    domain::{ClientConfig, ClientOptions, ProviderConfig, ProviderName, ProviderTransport, RemoteOperation},
    services::{SyncClientResult, SyncToolClient},
};

/// Client type exercised by the integration tests.
pub type TestClient = SyncToolClient<DefaultClock>;

/// Routes client logs through the test harness writer, filtered by
/// `RUST_LOG`.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    if installed.is_err() {
        tracing::trace!("tracing subscriber already installed for this test binary");
    }
}

/// Options with short timeouts so failure paths finish quickly.
#[fixture]
pub fn fast_options() -> ClientOptions {
    init_tracing();
    ClientOptions {
        connect_timeout_ms: 2_000,
        disconnect_timeout_ms: 200,
        shutdown_grace_ms: 200,
    }
}

/// Builds a validated provider name.
///
/// # Panics
///
/// Panics when `name` is not a valid provider name.
pub fn provider_name(name: &str) -> ProviderName {
    ProviderName::new(name).expect("valid provider name")
}

/// Operation taking one required `text` parameter.
///
/// # Panics
///
/// Panics when `name` is blank.
pub fn echo_operation(name: &str) -> RemoteOperation {
    RemoteOperation::new(
        name,
        "Echoes its text argument",
        json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }),
    )
    .expect("valid operation")
}

/// Operation whose parameters are all optional with defaults.
///
/// # Panics
///
/// Panics when `name` is blank.
pub fn defaults_operation(name: &str) -> RemoteOperation {
    RemoteOperation::new(
        name,
        "Reports the arguments it received",
        json!({
            "type": "object",
            "properties": {
                "page": {"type": "integer", "default": 1},
                "size": {"type": "integer", "default": 25}
            }
        }),
    )
    .expect("valid operation")
}

/// Provider whose operations answer with `{provider, operation, arguments}`.
pub fn reporting_provider(name: &str, operations: Vec<RemoteOperation>) -> InMemoryProvider {
    operations
        .into_iter()
        .fold(InMemoryProvider::new(provider_name(name)), |provider, operation| {
            let label = json!({"provider": name, "operation": operation.name()});
            provider.with_operation(operation, move |arguments| {
                let mut answer = label.clone();
                if let Value::Object(fields) = &mut answer {
                    fields.insert("arguments".to_owned(), Value::Object(arguments.clone()));
                }
                Ok(answer)
            })
        })
}

/// Configuration listing `names` in order, each with a placeholder stdio
/// transport.
///
/// # Panics
///
/// Panics when a name is invalid or repeated.
pub fn config_for(names: &[&str], options: ClientOptions) -> ClientConfig {
    names
        .iter()
        .fold(ClientConfig::new().with_options(options), |config, name| {
            let transport = ProviderTransport::stdio(format!("{name}-mcp")).expect("valid transport");
            config
                .with_provider(ProviderConfig::new(*name, transport).expect("valid provider config"))
                .expect("unique provider name")
        })
}

/// Registers `providers` and builds an unstarted client for them in order.
///
/// # Errors
///
/// Returns client construction errors.
pub fn client_for(
    providers: Vec<InMemoryProvider>,
    options: ClientOptions,
) -> SyncClientResult<TestClient> {
    let names: Vec<String> = providers
        .iter()
        .map(|provider| provider.name().as_str().to_owned())
        .collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let connector = providers
        .into_iter()
        .fold(InMemoryProviderConnector::new(), InMemoryProviderConnector::with_provider);
    SyncToolClient::new(
        config_for(&name_refs, options),
        Arc::new(connector),
        Arc::new(DefaultClock),
    )
}
