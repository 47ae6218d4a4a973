//! Registry of connected clients and their write halves.
//!
//! One mutex serializes every membership change and every outbound
//! write, so a broadcast always sees a consistent member set and no
//! line interleaves with another. Writes go through `try_write`,
//! which never blocks, so the lock is never held across an `.await`.

use std::collections::HashMap;
use std::io;

use parking_lot::Mutex;
use tokio::net::tcp::OwnedWriteHalf;

use crate::types::ClientId;

pub struct ClientRegistry {
    capacity: usize,
    members: Mutex<HashMap<ClientId, OwnedWriteHalf>>,
}

impl ClientRegistry {
    pub fn new(capacity: usize) -> Self {
        ClientRegistry {
            capacity,
            members: Mutex::new(HashMap::new()),
        }
    }

    /// Maximum number of simultaneous members.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current member count.
    pub fn count(&self) -> usize {
        self.members.lock().len()
    }

    /// Admit a member if a slot is free.
    ///
    /// The capacity check and the insertion happen under one lock
    /// acquisition, so concurrent admissions cannot overshoot. On
    /// rejection the write half is handed back so the caller can
    /// still send a parting line on it.
    pub fn try_admit(&self, id: ClientId, writer: OwnedWriteHalf) -> Result<(), OwnedWriteHalf> {
        let mut members = self.members.lock();
        if members.len() < self.capacity {
            members.insert(id, writer);
            Ok(())
        } else {
            Err(writer)
        }
    }

    /// Remove a member, returning its write half so the caller decides
    /// when the connection actually closes. No-op if `id` is not
    /// registered (e.g. already evicted by `close_all`).
    pub fn remove(&self, id: ClientId) -> Option<OwnedWriteHalf> {
        self.members.lock().remove(&id)
    }

    /// Write `bytes` to one member. Returns `false` if the member is
    /// unknown or its connection looks dead.
    pub fn send_to(&self, id: ClientId, bytes: &[u8]) -> bool {
        let members = self.members.lock();
        match members.get(&id) {
            Some(writer) => write_line(writer, bytes),
            None => false,
        }
    }

    /// Write `bytes` to every member. Failures are ignored here; a
    /// dead peer is reaped by its own session's next token push.
    pub fn broadcast(&self, bytes: &[u8]) {
        let members = self.members.lock();
        for writer in members.values() {
            write_line(writer, bytes);
        }
    }

    /// Broadcast the current member count as a decimal line.
    ///
    /// The count is formatted inside the same critical section that
    /// delivers it, so every receiver sees the size of one consistent
    /// membership snapshot.
    pub fn broadcast_count(&self) {
        let members = self.members.lock();
        let line = format!("{}\n", members.len());
        for writer in members.values() {
            write_line(writer, line.as_bytes());
        }
    }

    /// Drop every member's write half, closing the outbound side of
    /// all connections. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let mut members = self.members.lock();
        let closed = members.len();
        members.clear();
        closed
    }
}

/// Non-blocking line write. `WouldBlock` means the socket's send
/// buffer is full, not that the peer is gone, so it is not a failure.
/// A short write would tear the line, so the peer is written off.
fn write_line(writer: &OwnedWriteHalf, bytes: &[u8]) -> bool {
    match writer.try_write(bytes) {
        Ok(n) => n == bytes.len(),
        Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => true,
        Err(_) => false,
    }
}
