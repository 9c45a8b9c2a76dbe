//! Bounded box allocation
//!
//! At most `size` boxes exist at once. Each box holds a lease on its ID; the
//! ID goes back on the free list only after the box has been cleaned up, so
//! two live boxes never share an ID.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument};

use crate::isolate::{IsolateBox, IsolateCommand, IsolateError};

#[derive(Debug)]
pub struct BoxPool {
    binary: PathBuf,
    cgroup: bool,
    capacity: u32,
    slots: Arc<Semaphore>,
    free: Arc<Mutex<Vec<u32>>>,
}

impl BoxPool {
    /// Pool over box IDs `first_id .. first_id + size`
    pub fn new(first_id: u32, size: u32, binary: impl Into<PathBuf>, cgroup: bool) -> Self {
        // Popped from the back, so the lowest ID goes out first
        let free = (first_id..first_id.saturating_add(size)).rev().collect();
        Self {
            binary: binary.into(),
            cgroup,
            capacity: size,
            slots: Arc::new(Semaphore::new(size as usize)),
            free: Arc::new(Mutex::new(free)),
        }
    }

    /// Wait for a free slot and initialize a box in it
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<IsolateBox, IsolateError> {
        let lease = self.lease().await?;
        debug!(box_id = lease.id, "leased box id");

        let command = IsolateCommand::new(&self.binary, lease.id, self.cgroup);
        // On failure the lease drops here and the ID is free again
        let sandbox = IsolateBox::init(command).await?;
        Ok(sandbox.leased(lease))
    }

    async fn lease(&self) -> Result<BoxLease, IsolateError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| IsolateError::PoolClosed)?;

        // A permit guarantees an entry on the free list
        let id = self
            .free
            .lock()
            .map_err(|_| IsolateError::PoolClosed)?
            .pop()
            .ok_or(IsolateError::PoolClosed)?;

        Ok(BoxLease {
            id,
            free: Arc::clone(&self.free),
            _permit: permit,
        })
    }

    /// Refuse further acquisitions; boxes already handed out keep working
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    /// Boxes that can be acquired right now without waiting
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

/// Claim on one box ID
#[derive(Debug)]
pub(crate) struct BoxLease {
    id: u32,
    free: Arc<Mutex<Vec<u32>>>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for BoxLease {
    fn drop(&mut self) {
        // Fields drop after this body, so the ID is back before the permit
        if let Ok(mut free) = self.free.lock() {
            free.push(self.id);
        }
    }
}
