//! Connection supervisor
//!
//! Brings up every registered service connection concurrently and tears
//! them down again. Each connect runs in its own task, so a broken or slow
//! service never holds up the others, and callers may use a client as soon
//! as it reports connected.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sdv_broker::ServiceConnection;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How one connect task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    Failed,
    TimedOut,
    /// `stop()` ran before the connect finished
    Cancelled,
}

/// Result of a finished connect task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReport {
    pub client: &'static str,
    pub outcome: ConnectOutcome,
}

pub struct ConnectionSupervisor {
    connections: Vec<Arc<dyn ServiceConnection>>,
    connect_timeout: Option<Duration>,
    cancel: Mutex<CancellationToken>,
    tasks: Mutex<Vec<JoinHandle<ConnectReport>>>,
}

impl ConnectionSupervisor {
    /// `connect_timeout` bounds each connect; `None` waits forever
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self {
            connections: Vec::new(),
            connect_timeout,
            cancel: Mutex::new(CancellationToken::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&mut self, connection: Arc<dyn ServiceConnection>) {
        self.connections.push(connection);
    }

    /// Launch one connect task per registered connection. Does not wait.
    pub fn start(&self) {
        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();

        let mut tasks = self.tasks.lock();
        for connection in &self.connections {
            let connection = connection.clone();
            let cancel = cancel.clone();
            let timeout = self.connect_timeout;

            tasks.push(tokio::spawn(async move {
                let client = connection.name();
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(client, "Connect cancelled");
                        ConnectOutcome::Cancelled
                    }
                    outcome = connect(connection.as_ref(), timeout) => outcome,
                };
                ConnectReport { client, outcome }
            }));
        }
        info!(count = tasks.len(), "Connection tasks started");
    }

    /// Wait for all connect tasks launched by `start()`
    pub async fn join(&self) -> Vec<ConnectReport> {
        let tasks: Vec<_> = std::mem::take(&mut *self.tasks.lock());

        let mut reports = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(report) => reports.push(report),
                Err(e) => warn!(error = %e, "Connect task did not finish"),
            }
        }
        reports
    }

    /// Cancel pending connects, then disconnect every connection.
    ///
    /// Pending tasks are awaited before disconnecting so that no connect can
    /// complete afterwards. Disconnect failures are logged and never stop
    /// the remaining connections from being released.
    pub async fn stop(&self) {
        self.cancel.lock().cancel();

        let tasks: Vec<_> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task.abort();
            match task.await {
                Ok(report) => debug!(client = report.client, outcome = ?report.outcome, "Connect task finished"),
                Err(e) if e.is_panic() => warn!(error = %e, "Connect task panicked"),
                Err(_) => {}
            }
        }

        for connection in &self.connections {
            let client = connection.name();
            match connection.disconnect() {
                Ok(()) => debug!(client, "Disconnected"),
                Err(e) if e.is_not_connected() => debug!(client, "Was not connected"),
                Err(e) => warn!(client, error = %e, "Disconnect failed"),
            }
        }
        info!("Connections stopped");
    }
}

async fn connect(connection: &dyn ServiceConnection, timeout: Option<Duration>) -> ConnectOutcome {
    let client = connection.name();

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, connection.connect()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(client, timeout_ms = limit.as_millis() as u64, "Connect timed out");
                return ConnectOutcome::TimedOut;
            }
        },
        None => connection.connect().await,
    };

    match result {
        Ok(()) => {
            info!(client, address = %connection.endpoint().address, "Connection established");
            ConnectOutcome::Connected
        }
        Err(e) => {
            error!(client, error = %e, "Connection failed");
            ConnectOutcome::Failed
        }
    }
}
