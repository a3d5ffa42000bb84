//! Streaming session client.
//!
//! Owns the socket lifecycle for one rig connection: connect, decode the
//! line-oriented feed into [`SampleBatch`]es, fan batches out to registered
//! listeners, and retry on unexpected drops. Nothing inside the streaming
//! path surfaces an error to the caller; socket trouble only manifests as a
//! [`ConnectionState`] change plus a log line.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::decoder::decode_payload;
use crate::device::DeviceAddress;
use crate::types::SampleBatch;

/// Delay between reconnect attempts after an unexpected close. Fixed delay,
/// no backoff, no attempt cap.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Link state of the streaming client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Consumer of decoded sample batches.
///
/// Listeners are invoked on the reader task, one batch at a time, in exact
/// socket-delivery order. Every registered listener sees every batch.
pub trait BatchListener: Send + Sync {
    fn on_batch(&self, batch: &SampleBatch);
}

struct ClientShared {
    address: Mutex<DeviceAddress>,
    state: Mutex<ConnectionState>,
    listeners: Mutex<Vec<Arc<dyn BatchListener>>>,
    // Bumped on every connect/disconnect. A reader task whose generation no
    // longer matches must exit without touching state or listeners.
    generation: AtomicU64,
    reconnect_delay: Duration,
}

impl ClientShared {
    fn state(&self) -> ConnectionState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(ConnectionState::Disconnected)
    }

    fn set_state(&self, next: ConnectionState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    fn address(&self) -> DeviceAddress {
        self.address.lock().map(|a| *a).unwrap_or_default()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn dispatch(&self, batch: &SampleBatch) {
        if let Ok(listeners) = self.listeners.lock() {
            for listener in listeners.iter() {
                listener.on_batch(batch);
            }
        }
    }
}

/// Streaming session client. At most one live socket exists per instance;
/// construct one where the stream is needed and drop it when done.
pub struct StreamClient {
    shared: Arc<ClientShared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl StreamClient {
    pub fn new(address: DeviceAddress) -> Self {
        Self::with_reconnect_delay(address, RECONNECT_DELAY)
    }

    /// Client with a custom retry delay
    pub fn with_reconnect_delay(address: DeviceAddress, reconnect_delay: Duration) -> Self {
        Self {
            shared: Arc::new(ClientShared {
                address: Mutex::new(address),
                state: Mutex::new(ConnectionState::Disconnected),
                listeners: Mutex::new(Vec::new()),
                generation: AtomicU64::new(0),
                reconnect_delay,
            }),
            reader: Mutex::new(None),
        }
    }

    /// Open the link. No-op while a connection attempt or live link exists,
    /// so a second socket is never opened. Must be called from within a
    /// tokio runtime.
    pub fn connect(&self) {
        {
            let mut state = match self.shared.state.lock() {
                Ok(state) => state,
                Err(_) => return,
            };
            if *state != ConnectionState::Disconnected {
                return;
            }
            *state = ConnectionState::Connecting;
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            stream_loop(shared, generation).await;
        });
        if let Ok(mut slot) = self.reader.lock() {
            *slot = Some(handle);
        }
    }

    /// Close the link and suppress the reconnect policy. Idempotent; a
    /// pending retry timer is cancelled along with the reader task.
    pub fn disconnect(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.reader.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
        self.shared.set_state(ConnectionState::Disconnected);
    }

    /// Register a batch consumer. Listeners are independent; adding one
    /// never replaces another.
    pub fn add_listener(&self, listener: Arc<dyn BatchListener>) {
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.push(listener);
        }
    }

    /// Drop all listeners. Pauses consumption without touching the socket.
    pub fn clear_listeners(&self) {
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.clear();
        }
    }

    /// Store a new rig address. A live link is torn down first and reopened
    /// against the new address; the old socket is fully cancelled before the
    /// new one is opened.
    pub fn update_device_address(&self, address: DeviceAddress) {
        let relink = self.shared.state() != ConnectionState::Disconnected;
        if relink {
            self.disconnect();
        }
        if let Ok(mut slot) = self.shared.address.lock() {
            *slot = address;
        }
        if relink {
            self.connect();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn device_address(&self) -> DeviceAddress {
        self.shared.address()
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.reader.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

async fn stream_loop(shared: Arc<ClientShared>, generation: u64) {
    loop {
        let address = shared.address();
        shared.set_state(ConnectionState::Connecting);

        match TcpStream::connect(address.socket_addr()).await {
            Ok(stream) => {
                if !shared.is_current(generation) {
                    return;
                }
                log::info!("connected to rig at {}", address);
                shared.set_state(ConnectionState::Connected);
                read_stream(&shared, generation, stream).await;
            }
            Err(err) => {
                log::warn!("connection to {} failed: {}", address, err);
            }
        }

        if !shared.is_current(generation) {
            return;
        }
        shared.set_state(ConnectionState::Disconnected);
        log::info!(
            "link to {} down, retrying in {:.1}s",
            address,
            shared.reconnect_delay.as_secs_f64()
        );
        sleep(shared.reconnect_delay).await;
        if !shared.is_current(generation) {
            return;
        }
    }
}

/// Reads until the rig closes the link or the socket errors. A partial
/// trailing line carries over to the next read; the complete lines of one
/// read form one batch.
async fn read_stream(shared: &ClientShared, generation: u64, mut stream: TcpStream) {
    let mut carry = String::new();
    let mut chunk = [0u8; 4096];

    loop {
        let read = match stream.read(&mut chunk).await {
            Ok(0) => {
                log::info!("rig closed the connection");
                return;
            }
            Ok(read) => read,
            Err(err) => {
                log::warn!("socket read error: {}", err);
                return;
            }
        };
        if !shared.is_current(generation) {
            return;
        }

        carry.push_str(&String::from_utf8_lossy(&chunk[..read]));
        let cut = match carry.rfind('\n') {
            Some(cut) => cut,
            None => continue,
        };
        let payload: String = carry.drain(..=cut).collect();

        let samples = decode_payload(&payload);
        if samples.is_empty() {
            continue;
        }
        log::trace!("decoded batch of {} samples", samples.len());
        shared.dispatch(&SampleBatch::new(samples));
    }
}
