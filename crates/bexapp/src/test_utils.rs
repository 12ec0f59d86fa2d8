use crate::client::{CallError, Connector, Endpoint, ErrorCode, Handlers, RemoteClient};
use crate::error::RemoteError;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How a [`ScriptedClient`] answers every request.
#[derive(Debug, Clone)]
pub enum Script {
    Data(Value),
    Error(ErrorCode),
    /// Misbehaving transport: fires both callbacks for one request.
    DataThenError(Value, ErrorCode),
    ErrorThenData(ErrorCode, Value),
    /// Holds on to the handlers and never calls them.
    Silent,
    /// Drops the handlers without calling them.
    Drop,
    /// Fires the success callback from another thread after a delay.
    Delayed(Duration, Value),
    /// Refuses the connection.
    Refuse(String),
}

pub type RequestLog = Arc<Mutex<Vec<(String, Value)>>>;

pub struct ScriptedClient {
    script: Script,
    requests: RequestLog,
    held: Vec<Handlers>,
    threads: Vec<thread::JoinHandle<()>>,
}

impl ScriptedClient {
    pub fn new(script: Script) -> Self {
        Self::with_log(script, RequestLog::default())
    }

    pub fn with_log(script: Script, requests: RequestLog) -> Self {
        Self {
            script,
            requests,
            held: Vec::new(),
            threads: Vec::new(),
        }
    }
}

impl RemoteClient for ScriptedClient {
    fn connect(&mut self, endpoint: &Endpoint) -> Result<(), RemoteError> {
        match &self.script {
            Script::Refuse(reason) => Err(RemoteError::ConnectionFailed {
                server: endpoint.to_string(),
                reason: reason.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn request(&mut self, method: &str, params: Value, mut handlers: Handlers) {
        self.requests
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        match self.script.clone() {
            Script::Data(value) => (handlers.on_success)(value),
            Script::Error(code) => (handlers.on_error)(CallError::Server(code)),
            Script::DataThenError(value, code) => {
                (handlers.on_success)(value);
                (handlers.on_error)(CallError::Server(code));
            }
            Script::ErrorThenData(code, value) => {
                (handlers.on_error)(CallError::Server(code));
                (handlers.on_success)(value);
            }
            Script::Silent => self.held.push(handlers),
            Script::Drop | Script::Refuse(_) => drop(handlers),
            Script::Delayed(delay, value) => {
                self.threads.push(thread::spawn(move || {
                    thread::sleep(delay);
                    (handlers.on_success)(value);
                }));
            }
        }
    }

    fn wait(&mut self, _timeout: Duration) -> bool {
        self.held.is_empty()
    }
}

/// Connector handing out scripted clients that share one request log.
pub fn scripted_connector(script: Script) -> (Connector, RequestLog) {
    let requests = RequestLog::default();
    let log = Arc::clone(&requests);
    let connector: Connector = Arc::new(move |_timeout: Duration| {
        let client = ScriptedClient::with_log(script.clone(), Arc::clone(&log));
        Ok(Box::new(client) as Box<dyn RemoteClient>)
    });
    (connector, requests)
}
