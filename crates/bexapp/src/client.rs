//! # Remote Client
//!
//! The contract bex needs from whatever talks to the server:
//!
//! - [`RemoteClient::connect`] opens the connection, reporting success or failure.
//! - [`RemoteClient::request`] sends one request and registers two callbacks,
//!   exactly one of which should eventually fire.
//! - [`RemoteClient::wait`] blocks while outstanding requests settle.
//!
//! Callbacks may fire on any thread. Commands never consume them directly;
//! they go through [`crate::bridge::AsyncBridge`], which turns the pair into
//! a single blocking result.
//!
//! [`TcpClient`] is the shipped transport: newline-delimited JSON over TCP,
//! driven by a tokio runtime the client owns.

use crate::error::RemoteError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::debug;

/// An error reported through the error callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode {
    pub code: i64,
    pub message: String,
}

impl ErrorCode {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl From<ErrorCode> for RemoteError {
    fn from(error: ErrorCode) -> Self {
        RemoteError::Server {
            code: error.code,
            message: error.message,
        }
    }
}

/// What the error callback receives. Every code the server can send stays a
/// server error; the transport's own failures never carry a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    Server(ErrorCode),
    Transport(String),
}

impl From<CallError> for RemoteError {
    fn from(error: CallError) -> Self {
        match error {
            CallError::Server(code) => code.into(),
            CallError::Transport(message) => RemoteError::Transport(message),
        }
    }
}

pub type SuccessHandler = Box<dyn FnMut(Value) + Send>;
pub type ErrorHandler = Box<dyn FnMut(CallError) + Send>;

pub struct Handlers {
    pub on_error: ErrorHandler,
    pub on_success: SuccessHandler,
}

pub trait RemoteClient {
    fn connect(&mut self, endpoint: &Endpoint) -> Result<(), RemoteError>;

    fn request(&mut self, method: &str, params: Value, handlers: Handlers);

    /// Returns `false` if requests were still outstanding when `timeout` elapsed.
    fn wait(&mut self, timeout: Duration) -> bool;
}

/// Produces a fresh client; the argument is the connect timeout.
pub type Connector =
    Arc<dyn Fn(Duration) -> Result<Box<dyn RemoteClient>, RemoteError> + Send + Sync>;

pub fn tcp_connector() -> Connector {
    Arc::new(|timeout: Duration| {
        let client = TcpClient::new(timeout)?;
        Ok(Box::new(client) as Box<dyn RemoteClient>)
    })
}

/// Server address, written `tcp://host:port` or `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, suitable for a socket connect.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = match s.split_once("://") {
            Some(("tcp", rest)) => rest,
            Some((scheme, _)) => return Err(format!("unsupported scheme '{}' in '{}'", scheme, s)),
            None => s,
        };
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| format!("missing port in server address '{}'", s))?;
        if host.is_empty() || host.contains('/') {
            return Err(format!("malformed host in server address '{}'", s));
        }
        let port = port
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| format!("invalid port in server address '{}'", s))?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    code: i64,
    #[serde(default)]
    message: String,
}

enum Reply {
    Data(Value),
    Error(ErrorCode),
}

/// Newline-delimited JSON client over one TCP connection.
///
/// Requests run on the client's runtime; callbacks fire on its worker thread.
/// Requests are strictly sequential: the connection is lent to the in-flight
/// request and handed back when [`RemoteClient::wait`] collects it.
pub struct TcpClient {
    runtime: Runtime,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
    pending: Vec<JoinHandle<Option<TcpStream>>>,
    next_id: u64,
}

impl TcpClient {
    pub fn new(connect_timeout: Duration) -> Result<Self, RemoteError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("bex-transport")
            .enable_all()
            .build()
            .map_err(|e| RemoteError::Transport(format!("cannot start runtime: {}", e)))?;
        Ok(Self {
            runtime,
            connect_timeout,
            stream: None,
            pending: Vec::new(),
            next_id: 0,
        })
    }
}

impl RemoteClient for TcpClient {
    fn connect(&mut self, endpoint: &Endpoint) -> Result<(), RemoteError> {
        let authority = endpoint.authority();
        let timeout = self.connect_timeout;
        let connected = self.runtime.block_on(async move {
            tokio::time::timeout(timeout, TcpStream::connect(authority)).await
        });

        let failed = |reason: String| RemoteError::ConnectionFailed {
            server: endpoint.to_string(),
            reason,
        };
        match connected {
            Ok(Ok(stream)) => {
                debug!(server = %endpoint, "connected");
                self.stream = Some(stream);
                Ok(())
            }
            Ok(Err(e)) => Err(failed(e.to_string())),
            Err(_) => Err(failed(format!(
                "timed out after {}s",
                timeout.as_secs_f64()
            ))),
        }
    }

    fn request(&mut self, method: &str, params: Value, mut handlers: Handlers) {
        let Some(stream) = self.stream.take() else {
            (handlers.on_error)(CallError::Transport("not connected".to_string()));
            return;
        };

        self.next_id += 1;
        let id = self.next_id;
        let request = json!({ "id": id, "method": method, "params": params });
        debug!(id, method, "sending request");

        let handle = self.runtime.spawn(async move {
            match exchange(stream, id, &request).await {
                Ok((Reply::Data(value), stream)) => {
                    (handlers.on_success)(value);
                    Some(stream)
                }
                Ok((Reply::Error(code), stream)) => {
                    (handlers.on_error)(CallError::Server(code));
                    Some(stream)
                }
                Err(reason) => {
                    (handlers.on_error)(CallError::Transport(reason));
                    None
                }
            }
        });
        self.pending.push(handle);
    }

    fn wait(&mut self, timeout: Duration) -> bool {
        let pending = std::mem::take(&mut self.pending);
        let settled = self.runtime.block_on(async move {
            tokio::time::timeout(timeout, async move {
                let mut returned = None;
                for handle in pending {
                    if let Ok(Some(stream)) = handle.await {
                        returned = Some(stream);
                    }
                }
                returned
            })
            .await
        });

        match settled {
            Ok(stream) => {
                if stream.is_some() {
                    self.stream = stream;
                }
                true
            }
            Err(_) => false,
        }
    }
}

async fn exchange(
    stream: TcpStream,
    id: u64,
    request: &Value,
) -> Result<(Reply, TcpStream), String> {
    let io = |e: std::io::Error| e.to_string();

    let mut line = serde_json::to_vec(request)
        .map_err(|e| format!("cannot encode request: {}", e))?;
    line.push(b'\n');

    let mut reader = BufReader::new(stream);
    reader.get_mut().write_all(&line).await.map_err(io)?;

    let mut response = String::new();
    if reader.read_line(&mut response).await.map_err(io)? == 0 {
        return Err("server closed the connection".to_string());
    }

    let response: Response = serde_json::from_str(&response)
        .map_err(|e| format!("malformed response: {}", e))?;
    if response.id != id {
        return Err(format!(
            "response id {} does not match request id {}",
            response.id, id
        ));
    }

    let reply = match response.error {
        Some(error) => Reply::Error(ErrorCode::new(error.code, error.message)),
        None => Reply::Data(response.result.unwrap_or(Value::Null)),
    };
    Ok((reply, reader.into_inner()))
}
