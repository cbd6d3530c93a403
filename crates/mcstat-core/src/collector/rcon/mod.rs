//! RCON session and server-wide report collection.
//!
//! A single persistent connection carries one command at a time. The session
//! reconnects transparently: any transport failure drops the connection, and
//! the next cycle's first command connects again.
//!
//! Connection parameters come from configuration:
//! - host and password are required; without them RCON stays disabled for the
//!   whole process lifetime
//! - port defaults to 25575

mod protocol;
pub mod reports;

use std::time::Duration;

use tracing::{debug, info, warn};

pub use protocol::{RconConnection, TcpConnector};
pub use reports::{REPORTS, ReportKind, ReportSpec, ReportToggles};

/// Default RCON port of a vanilla server.
pub const DEFAULT_PORT: u16 = 25575;

/// Error type for RCON transport failures.
#[derive(Debug)]
pub enum RconError {
    /// Socket-level failure: refused, reset, broken pipe, timeout.
    Io(std::io::Error),
    /// The server rejected the password.
    Auth,
    /// The server sent something that is not a valid RCON packet.
    Protocol(String),
    /// Command does not fit into one request packet.
    CommandTooLong(usize),
}

impl std::fmt::Display for RconError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RconError::Io(e) => write!(f, "RCON I/O error: {}", e),
            RconError::Auth => write!(f, "RCON authentication failed"),
            RconError::Protocol(msg) => write!(f, "RCON protocol error: {}", msg),
            RconError::CommandTooLong(len) => write!(f, "RCON command too long: {} bytes", len),
        }
    }
}

impl std::error::Error for RconError {}

impl From<std::io::Error> for RconError {
    fn from(e: std::io::Error) -> Self {
        RconError::Io(e)
    }
}

/// An established, authenticated connection.
pub trait Transport: Send {
    /// Sends one command and waits for its complete response.
    fn command(&mut self, command: &str) -> Result<String, RconError>;
}

/// Opens new connections for a session.
pub trait Connector: Send {
    type Transport: Transport;

    /// Connects and authenticates.
    fn connect(&self) -> Result<Self::Transport, RconError>;

    /// Human-readable endpoint, for logs.
    fn endpoint(&self) -> String;
}

/// RCON connection settings.
#[derive(Debug, Clone)]
pub struct RconConfig {
    pub host: Option<String>,
    pub port: u16,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl Default for RconConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            password: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Observable state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No credentials configured; never connects.
    Disabled,
    Disconnected,
    Connected,
}

/// Owns the one RCON connection of the process.
///
/// `execute` takes `&mut self`, so at most one command is ever in flight.
pub struct RconSession<C: Connector> {
    connector: Option<C>,
    transport: Option<C::Transport>,
    /// Set when a command failed; cleared by `begin_cycle`.
    cycle_failed: bool,
    last_error: Option<String>,
}

impl RconSession<TcpConnector> {
    /// Creates a TCP session from configuration.
    ///
    /// Returns a disabled session if the host or the password is missing.
    pub fn from_config(config: &RconConfig) -> Self {
        match (&config.host, &config.password) {
            (Some(host), Some(password)) if !host.is_empty() => {
                info!(host = %host, port = config.port, "RCON enabled");
                Self::new(TcpConnector::new(
                    host.clone(),
                    config.port,
                    password.clone(),
                    config.timeout,
                ))
            }
            _ => {
                info!("RCON disabled: host or password not configured");
                Self::disabled()
            }
        }
    }
}

impl<C: Connector> RconSession<C> {
    /// Creates a session that connects lazily through `connector`.
    pub fn new(connector: C) -> Self {
        Self {
            connector: Some(connector),
            transport: None,
            cycle_failed: false,
            last_error: None,
        }
    }

    /// Creates a permanently disabled session.
    pub fn disabled() -> Self {
        Self {
            connector: None,
            transport: None,
            cycle_failed: false,
            last_error: None,
        }
    }

    /// Returns whether the session can ever connect.
    pub fn is_enabled(&self) -> bool {
        self.connector.is_some()
    }

    pub fn state(&self) -> SessionState {
        match (&self.connector, &self.transport) {
            (None, _) => SessionState::Disabled,
            (Some(_), None) => SessionState::Disconnected,
            (Some(_), Some(_)) => SessionState::Connected,
        }
    }

    /// Returns the last error message, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Marks the start of a collection cycle, re-allowing connection attempts.
    pub fn begin_cycle(&mut self) {
        self.cycle_failed = false;
    }

    /// Runs one command, connecting first if needed.
    ///
    /// Returns `None` when RCON is disabled, the connection cannot be
    /// established, or the command fails in flight. After a failure the
    /// session stays disconnected until the next `begin_cycle`.
    pub fn execute(&mut self, command: &str) -> Option<String> {
        let connector = self.connector.as_ref()?;

        if self.cycle_failed {
            debug!(command, "skipping RCON command after earlier failure this cycle");
            return None;
        }

        if self.transport.is_none() {
            match connector.connect() {
                Ok(transport) => {
                    info!(endpoint = %connector.endpoint(), "RCON connected");
                    self.transport = Some(transport);
                    self.last_error = None;
                }
                Err(e) => {
                    warn!(endpoint = %connector.endpoint(), error = %e, "RCON connect failed");
                    self.fail(e);
                    return None;
                }
            }
        }

        let transport = self.transport.as_mut()?;
        match transport.command(command) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(command, error = %e, "lost RCON connection");
                self.transport = None;
                self.fail(e);
                None
            }
        }
    }

    fn fail(&mut self, e: RconError) {
        self.last_error = Some(e.to_string());
        self.cycle_failed = true;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted connector for session and collector tests.

    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    /// What the fake server does for one command.
    #[derive(Debug, Clone)]
    pub enum Reply {
        Text(String),
        Drop,
    }

    #[derive(Debug, Default)]
    pub struct Script {
        pub connects: usize,
        pub refuse_connect: bool,
        pub sent: Vec<String>,
        /// Per-command queued replies; falls back to `defaults`.
        pub queued: HashMap<String, VecDeque<Reply>>,
        pub defaults: HashMap<String, String>,
    }

    #[derive(Clone, Default)]
    pub struct ScriptedConnector(pub Arc<Mutex<Script>>);

    impl ScriptedConnector {
        pub fn respond(&self, command: &str, text: &str) -> &Self {
            self.0
                .lock()
                .unwrap()
                .defaults
                .insert(command.to_string(), text.to_string());
            self
        }

        pub fn queue(&self, command: &str, reply: Reply) -> &Self {
            self.0
                .lock()
                .unwrap()
                .queued
                .entry(command.to_string())
                .or_default()
                .push_back(reply);
            self
        }

        pub fn refuse(&self, refuse: bool) {
            self.0.lock().unwrap().refuse_connect = refuse;
        }

        pub fn connects(&self) -> usize {
            self.0.lock().unwrap().connects
        }

        pub fn sent(&self) -> Vec<String> {
            self.0.lock().unwrap().sent.clone()
        }
    }

    pub struct ScriptedTransport(Arc<Mutex<Script>>);

    impl Transport for ScriptedTransport {
        fn command(&mut self, command: &str) -> Result<String, RconError> {
            let mut script = self.0.lock().unwrap();
            script.sent.push(command.to_string());
            let reply = script
                .queued
                .get_mut(command)
                .and_then(VecDeque::pop_front)
                .or_else(|| script.defaults.get(command).cloned().map(Reply::Text));
            match reply {
                Some(Reply::Text(text)) => Ok(text),
                Some(Reply::Drop) => Err(RconError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "broken pipe",
                ))),
                None => Ok(format!("Unknown command: {command}")),
            }
        }
    }

    impl Connector for ScriptedConnector {
        type Transport = ScriptedTransport;

        fn connect(&self) -> Result<ScriptedTransport, RconError> {
            let mut script = self.0.lock().unwrap();
            script.connects += 1;
            if script.refuse_connect {
                return Err(RconError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )));
            }
            Ok(ScriptedTransport(self.0.clone()))
        }

        fn endpoint(&self) -> String {
            "scripted".to_string()
        }
    }
}
