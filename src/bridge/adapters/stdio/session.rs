//! Stdio provider session and connector.

use super::jsonrpc::{
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, call_params, extract_result,
    initialize_params, parse_tool_page,
};
use crate::bridge::{
    domain::{ProviderConfig, ProviderName, ProviderTransport, RemoteOperation, StdioTransportConfig},
    ports::{ProviderConnector, ProviderSession, ProviderSessionError, ProviderSessionResult},
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

/// How long a child may take to exit after its stdin closes before it is
/// killed.
const EXIT_WAIT: Duration = Duration::from_secs(2);

/// Upper bound on `tools/list` pages followed during discovery.
const MAX_TOOL_PAGES: usize = 64;

/// Provider session over a spawned child process.
///
/// Requests are serialized: each one holds the connection until its matching
/// response arrives.
#[derive(Debug)]
pub struct StdioProviderSession {
    name: ProviderName,
    config: StdioTransportConfig,
    next_id: AtomicU64,
    connection: Mutex<Option<StdioConnection>>,
}

#[derive(Debug)]
struct StdioConnection {
    child: Child,
    writer: ChildStdin,
    reader: BufReader<ChildStdout>,
}

impl StdioProviderSession {
    /// Creates an unconnected session.
    #[must_use]
    pub fn new(name: ProviderName, config: StdioTransportConfig) -> Self {
        Self {
            name,
            config,
            next_id: AtomicU64::new(1),
            connection: Mutex::new(None),
        }
    }

    /// Returns the provider name.
    #[must_use]
    pub const fn name(&self) -> &ProviderName {
        &self.name
    }

    fn spawn(&self) -> ProviderSessionResult<StdioConnection> {
        let mut command = Command::new(self.config.command());
        command
            .args(self.config.args())
            .envs(self.config.env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(directory) = self.config.working_directory() {
            command.current_dir(directory);
        }

        let mut child = command.spawn().map_err(|err| ProviderSessionError::Spawn {
            provider: self.name.clone(),
            reason: format!("{}: {err}", self.config.command()),
        })?;
        let (Some(writer), Some(reader)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(ProviderSessionError::Spawn {
                provider: self.name.clone(),
                reason: "child process has no piped stdio".to_owned(),
            });
        };

        tracing::debug!(provider = %self.name, command = self.config.command(), "spawned stdio provider");
        Ok(StdioConnection {
            child,
            writer,
            reader: BufReader::new(reader),
        })
    }

    async fn handshake(
        &self,
        connection: &mut StdioConnection,
    ) -> ProviderSessionResult<Vec<RemoteOperation>> {
        self.request(connection, "initialize", Some(initialize_params()))
            .await?;
        self.notify(connection, "notifications/initialized").await?;

        let mut operations = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_TOOL_PAGES {
            let params = cursor.take().map(|next| json!({ "cursor": next }));
            let result = self.request(connection, "tools/list", params).await?;
            let page = parse_tool_page(&self.name, result)?;
            operations.extend(page.operations);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(operations),
            }
        }
        Err(self.protocol_error(format!(
            "tools/list did not finish within {MAX_TOOL_PAGES} pages"
        )))
    }

    async fn request(
        &self,
        connection: &mut StdioConnection,
        method: &str,
        params: Option<Value>,
    ) -> ProviderSessionResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.write_line(connection, &JsonRpcRequest::new(id, method, params))
            .await?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = connection
                .reader
                .read_line(&mut line)
                .await
                .map_err(|err| self.protocol_error(format!("failed to read from stdout: {err}")))?;
            if read == 0 {
                return Err(self.protocol_error("provider closed its stdout"));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                Ok(response) if response.id == Some(id) => return extract_result(response),
                Ok(_) => {
                    tracing::trace!(provider = %self.name, "skipping unrelated message");
                }
                Err(_) => {
                    tracing::trace!(provider = %self.name, "skipping non-JSON-RPC output line");
                }
            }
        }
    }

    async fn notify(
        &self,
        connection: &mut StdioConnection,
        method: &str,
    ) -> ProviderSessionResult<()> {
        self.write_line(connection, &JsonRpcNotification::new(method, None))
            .await
    }

    async fn write_line<T: Serialize + Sync>(
        &self,
        connection: &mut StdioConnection,
        message: &T,
    ) -> ProviderSessionResult<()> {
        let mut encoded = serde_json::to_string(message)
            .map_err(|err| self.protocol_error(format!("failed to encode message: {err}")))?;
        encoded.push('\n');
        connection
            .writer
            .write_all(encoded.as_bytes())
            .await
            .map_err(|err| self.protocol_error(format!("failed to write to stdin: {err}")))?;
        connection
            .writer
            .flush()
            .await
            .map_err(|err| self.protocol_error(format!("failed to flush stdin: {err}")))
    }

    async fn terminate(&self, connection: StdioConnection) -> ProviderSessionResult<()> {
        let StdioConnection {
            mut child,
            writer,
            reader,
        } = connection;
        drop(writer);
        drop(reader);

        match tokio::time::timeout(EXIT_WAIT, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(provider = %self.name, %status, "stdio provider exited");
                Ok(())
            }
            Ok(Err(err)) => Err(ProviderSessionError::runtime(err)),
            Err(_) => {
                tracing::debug!(provider = %self.name, "stdio provider did not exit, killing");
                child.kill().await.map_err(ProviderSessionError::runtime)
            }
        }
    }

    fn protocol_error(&self, reason: impl Into<String>) -> ProviderSessionError {
        ProviderSessionError::Protocol {
            provider: self.name.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ProviderSession for StdioProviderSession {
    async fn connect(&self) -> ProviderSessionResult<Vec<RemoteOperation>> {
        let mut slot = self.connection.lock().await;
        if slot.is_some() {
            return Err(self.protocol_error("session is already connected"));
        }

        let mut connection = self.spawn()?;
        match self.handshake(&mut connection).await {
            Ok(operations) => {
                *slot = Some(connection);
                Ok(operations)
            }
            Err(err) => {
                if let Err(kill_err) = connection.child.kill().await {
                    tracing::warn!(provider = %self.name, error = %kill_err, "failed to kill provider after handshake failure");
                }
                Err(err)
            }
        }
    }

    async fn invoke(
        &self,
        operation: &str,
        arguments: Map<String, Value>,
    ) -> ProviderSessionResult<Value> {
        let mut slot = self.connection.lock().await;
        let connection = slot
            .as_mut()
            .ok_or_else(|| ProviderSessionError::NotConnected(self.name.clone()))?;
        self.request(
            connection,
            "tools/call",
            Some(call_params(operation, arguments)),
        )
        .await
    }

    async fn disconnect(&self) -> ProviderSessionResult<()> {
        let Some(connection) = self.connection.lock().await.take() else {
            return Ok(());
        };
        self.terminate(connection).await
    }
}

/// Connector that spawns a [`StdioProviderSession`] per `stdio` provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioProviderConnector;

impl StdioProviderConnector {
    /// Creates the connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProviderConnector for StdioProviderConnector {
    fn open(&self, config: &ProviderConfig) -> ProviderSessionResult<Arc<dyn ProviderSession>> {
        match config.transport() {
            ProviderTransport::Stdio(stdio) => Ok(Arc::new(StdioProviderSession::new(
                config.name().clone(),
                stdio.clone(),
            ))),
            ProviderTransport::HttpSse(_) => Err(ProviderSessionError::UnsupportedTransport {
                provider: config.name().clone(),
                reason: "http_sse providers need a connector that speaks HTTP+SSE".to_owned(),
            }),
        }
    }
}
