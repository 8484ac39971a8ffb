//! In-process transport backend.
//!
//! A [`MemoryDie`] behaves like a Pixels die without a radio: the test
//! (or simulator) side injects notification bytes with
//! [`MemoryDie::notify`] and inspects what the bridge wrote with
//! [`MemoryDie::written`]. Handles are cheap clones sharing one state, so
//! a test can keep a handle after handing the die to a [`MemoryScanner`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    DeviceSelector, DieLink, GattIds, Peripheral, Scanner, TransportError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct DieShared {
    failures_left: AtomicU32,
    open_calls: AtomicU32,
    writable: bool,
    /// Sender of the current link, tagged with its generation.
    notify_tx: Mutex<Option<(u64, mpsc::UnboundedSender<Vec<u8>>)>>,
    generation: AtomicU64,
    written: Mutex<Vec<Vec<u8>>>,
    close_calls: AtomicU32,
}

/// A simulated die.
#[derive(Debug, Clone)]
pub struct MemoryDie {
    name: String,
    shared: Arc<DieShared>,
}

impl MemoryDie {
    /// Creates a die that opens on the first try and accepts writes.
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), 0, true)
    }

    /// Makes the first `count` opens fail after the radio connected, the
    /// way a die that is missing its service fails. Each failed open
    /// drops that connection again.
    pub fn failing(self, count: u32) -> Self {
        self.shared.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Removes the write characteristic, like older firmware.
    pub fn without_write(self) -> Self {
        Self::build(
            self.name,
            self.shared.failures_left.load(Ordering::SeqCst),
            false,
        )
    }

    fn build(name: String, failures: u32, writable: bool) -> Self {
        Self {
            name,
            shared: Arc::new(DieShared {
                failures_left: AtomicU32::new(failures),
                open_calls: AtomicU32::new(0),
                writable,
                notify_tx: Mutex::new(None),
                generation: AtomicU64::new(0),
                written: Mutex::new(Vec::new()),
                close_calls: AtomicU32::new(0),
            }),
        }
    }

    /// Delivers a notification to the open link.
    ///
    /// Returns `false` if no link is open.
    pub fn notify(&self, bytes: impl Into<Vec<u8>>) -> bool {
        match lock(&self.shared.notify_tx).as_ref() {
            Some((_, tx)) => tx.send(bytes.into()).is_ok(),
            None => false,
        }
    }

    /// Simulates the die going out of range: the open link sees
    /// end-of-stream.
    pub fn drop_link(&self) {
        lock(&self.shared.notify_tx).take();
    }

    /// Every payload written to the die so far.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.shared.written).clone()
    }

    /// How many times [`Peripheral::open`] was called.
    pub fn open_calls(&self) -> u32 {
        self.shared.open_calls.load(Ordering::SeqCst)
    }

    /// How many times the host dropped a connection to this die, either
    /// by closing a link or after a failed open.
    pub fn close_calls(&self) -> u32 {
        self.shared.close_calls.load(Ordering::SeqCst)
    }

    /// Whether a link is currently open.
    pub fn is_open(&self) -> bool {
        lock(&self.shared.notify_tx).is_some()
    }
}

impl Peripheral for MemoryDie {
    type Link = MemoryLink;

    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<MemoryLink, TransportError> {
        self.shared.open_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .shared
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                n.checked_sub(1)
            })
            .is_ok();
        if failing {
            self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
            debug!(die = %self.name, "memory open failed, connection dropped");
            return Err(TransportError::ServiceNotFound(GattIds::PIXELS.service));
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.shared.notify_tx) = Some((generation, tx));
        debug!(die = %self.name, generation, "memory link open");

        Ok(MemoryLink {
            rx: tokio::sync::Mutex::new(rx),
            shared: Arc::clone(&self.shared),
            generation,
            closed: AtomicBool::new(false),
        })
    }
}

/// The open side of a [`MemoryDie`].
#[derive(Debug)]
pub struct MemoryLink {
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    shared: Arc<DieShared>,
    generation: u64,
    closed: AtomicBool,
}

impl DieLink for MemoryLink {
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if !self.shared.writable {
            return Err(TransportError::WriteUnavailable);
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        lock(&self.shared.written).push(data.to_vec());
        Ok(())
    }

    fn can_write(&self) -> bool {
        self.shared.writable
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut current = lock(&self.shared.notify_tx);
        if current.as_ref().is_some_and(|(g, _)| *g == self.generation) {
            current.take();
        }
        Ok(())
    }
}

/// Hands out [`MemoryDie`]s in the order they were added.
///
/// Clones share the same set of dice, so a test can keep adding dice
/// after the scanner has been handed to the bridge.
#[derive(Debug, Clone, Default)]
pub struct MemoryScanner {
    in_range: Arc<Mutex<VecDeque<MemoryDie>>>,
}

impl MemoryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `die` available to the next matching request.
    pub fn push(&self, die: MemoryDie) {
        lock(&self.in_range).push_back(die);
    }
}

impl Scanner for MemoryScanner {
    type Peripheral = MemoryDie;

    async fn request_device(
        &self,
        selector: &DeviceSelector,
    ) -> Result<MemoryDie, TransportError> {
        let mut in_range = lock(&self.in_range);
        let index = in_range.iter().position(|die| {
            selector.name.as_deref().is_none_or(|wanted| die.name == wanted)
        });
        index
            .and_then(|i| in_range.remove(i))
            .ok_or(TransportError::NoDevice {
                service: selector.service,
            })
    }
}
