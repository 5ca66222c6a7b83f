//! Controller link over TCP
//!
//! Every cycle sends one message and waits, bounded, for one reply:
//!
//! 1. connect if needed; on failure back off and try again
//! 2. send the newest queued measurement, or `idle ` when none is queued
//! 3. wait up to the reply timeout and merge the reply into the command table
//! 4. sleep out the rest of the cycle, measured from the cycle start
//!
//! A missing reply is logged and the link stays up. Socket errors and a
//! closed peer drop the connection; the next cycle reconnects.

use std::sync::Arc;
use std::time::Duration;

use beamcheck::config::CommsConfig;
use beamcheck::protocol::{encode_outbound, Measurement};
use beamcheck::LiveConfig;
use shared::latest::LatestSlot;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};

/// Largest reply read in one cycle
pub const READ_BUFFER_LEN: usize = 1024;

/// Error from one link cycle
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("send: {0}")]
    Send(#[source] std::io::Error),
    #[error("receive: {0}")]
    Receive(#[source] std::io::Error),
    #[error("connection closed by controller")]
    ConnectionClosed,
}

/// Link timing and peer address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// `host:port` of the controller
    pub address: String,
    /// Minimum period of one cycle
    pub cycle: Duration,
    pub reply_timeout: Duration,
    pub reconnect_backoff: Duration,
}

impl SessionSettings {
    pub fn from_config(comms: &CommsConfig) -> Self {
        Self {
            address: format!("{}:{}", comms.address, comms.port),
            cycle: Duration::from_millis(comms.cycle_ms),
            reply_timeout: Duration::from_millis(comms.reply_timeout_ms),
            reconnect_backoff: Duration::from_millis(comms.reconnect_backoff_ms),
        }
    }
}

/// What a completed cycle received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Reply merged; number of clauses applied
    Replied(usize),
    /// No reply within the timeout
    TimedOut,
}

pub struct SessionDriver {
    settings: SessionSettings,
    live: LiveConfig,
    outbox: Arc<LatestSlot<Measurement>>,
    stream: Option<TcpStream>,
}

impl SessionDriver {
    pub fn new(settings: SessionSettings, live: LiveConfig, outbox: Arc<LatestSlot<Measurement>>) -> Self {
        Self {
            settings,
            live,
            outbox,
            stream: None,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn connect(&mut self) -> Result<(), SessionError> {
        let stream = TcpStream::connect(&self.settings.address)
            .await
            .map_err(|source| SessionError::Connect {
                address: self.settings.address.clone(),
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {e}");
        }
        info!("Connected to controller at {}", self.settings.address);
        self.stream = Some(stream);
        Ok(())
    }

    /// Send one message and wait for the reply.
    ///
    /// Any error other than a timeout leaves the driver disconnected.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, SessionError> {
        let result = self.exchange().await;
        if result.is_err() {
            self.stream = None;
        }
        result
    }

    async fn exchange(&mut self) -> Result<CycleOutcome, SessionError> {
        if self.stream.is_none() {
            self.connect().await?;
        }
        let message = encode_outbound(self.outbox.take().as_ref(), &self.live.encode_context());
        let Some(stream) = self.stream.as_mut() else {
            return Err(SessionError::ConnectionClosed);
        };

        stream
            .write_all(message.as_bytes())
            .await
            .map_err(SessionError::Send)?;
        debug!("TX {message}");

        let mut buf = [0u8; READ_BUFFER_LEN];
        match timeout(self.settings.reply_timeout, stream.read(&mut buf)).await {
            Err(_) => {
                warn!(
                    "No reply from controller within {} ms",
                    self.settings.reply_timeout.as_millis()
                );
                Ok(CycleOutcome::TimedOut)
            }
            Ok(Err(e)) => Err(SessionError::Receive(e)),
            Ok(Ok(0)) => Err(SessionError::ConnectionClosed),
            Ok(Ok(n)) => {
                let reply = String::from_utf8_lossy(&buf[..n]);
                debug!("RX {}", reply.trim());
                Ok(CycleOutcome::Replied(self.live.apply_message(&reply)))
            }
        }
    }

    /// Cycle until `shutdown` changes or its sender is dropped.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Controller link started for {}", self.settings.address);
        loop {
            let started = Instant::now();
            let next = match self.run_cycle().await {
                Ok(_) => started + self.settings.cycle,
                Err(e @ SessionError::Connect { .. }) => {
                    warn!("{e}, retrying in {} ms", self.settings.reconnect_backoff.as_millis());
                    Instant::now() + self.settings.reconnect_backoff
                }
                Err(e) => {
                    warn!("Controller link lost: {e}");
                    started + self.settings.cycle
                }
            };

            tokio::select! {
                _ = sleep_until(next) => {}
                _ = shutdown.changed() => break,
            }
        }
        info!("Controller link stopped");
    }
}
