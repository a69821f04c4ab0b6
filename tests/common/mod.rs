//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gatewayd::error::ServeError;
use gatewayd::lifecycle::{ServeFuture, ServiceUnit};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// Reserve a loopback port that is free right now.
pub fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// In-memory sink for JSON log lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn events(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// Events whose message is exactly `message`.
    pub fn with_message(&self, message: &str) -> Vec<serde_json::Value> {
        self.events()
            .into_iter()
            .filter(|e| e["fields"]["message"] == message)
            .collect()
    }

    pub fn access_events(&self) -> Vec<serde_json::Value> {
        self.events()
            .into_iter()
            .filter(|e| e["target"] == gatewayd::observability::logging::ACCESS_TARGET)
            .collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture log events on the current thread until the guard drops.
///
/// Tests run on the current-thread runtime, so spawned tasks log here too.
pub fn capture() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(buffer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

/// How a [`FakeUnit`] behaves once serving.
#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Serve until drained, then report the shutdown sentinel.
    UntilDrained,
    /// Fail with an I/O error after the delay, ignoring drain.
    FailAfter(Duration),
    /// Never return, even when drained.
    IgnoreDrain,
}

/// A scripted service unit.
pub struct FakeUnit {
    name: String,
    address: SocketAddr,
    behaviour: Behaviour,
}

impl FakeUnit {
    pub fn new(name: &str, behaviour: Behaviour) -> Self {
        Self::on(name, "127.0.0.1:0".parse().unwrap(), behaviour)
    }

    pub fn on(name: &str, address: SocketAddr, behaviour: Behaviour) -> Self {
        Self {
            name: name.to_string(),
            address,
            behaviour,
        }
    }
}

impl ServiceUnit for FakeUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind_address(&self) -> SocketAddr {
        self.address
    }

    fn serve(self: Box<Self>, listener: TcpListener, drain: CancellationToken) -> ServeFuture {
        Box::pin(async move {
            let _listener = listener;
            match self.behaviour {
                Behaviour::UntilDrained => {
                    drain.cancelled().await;
                    Err(ServeError::Closed)
                }
                Behaviour::FailAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    Err(ServeError::from(io::Error::other(format!("{} broke", self.name))))
                }
                Behaviour::IgnoreDrain => std::future::pending().await,
            }
        })
    }
}
