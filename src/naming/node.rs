use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::error::{ArborError, Result};
use crate::naming::registry::StorageNodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl LockMode {
    pub fn from_exclusive(exclusive: bool) -> Self {
        if exclusive {
            LockMode::Exclusive
        } else {
            LockMode::Shared
        }
    }
}

/// A lock request waiting in a node's queue.
struct PendingRequest {
    mode: LockMode,
    grant: oneshot::Sender<()>,
}

/// Shared/exclusive state plus the FIFO of requests not yet granted.
#[derive(Default)]
pub(crate) struct LockState {
    writer_active: bool,
    reader_count: usize,
    queue: VecDeque<PendingRequest>,
}

impl LockState {
    fn can_grant(&self, mode: LockMode) -> bool {
        match mode {
            LockMode::Exclusive => self.reader_count == 0 && !self.writer_active,
            LockMode::Shared => !self.writer_active,
        }
    }

    fn apply(&mut self, mode: LockMode) {
        match mode {
            LockMode::Exclusive => self.writer_active = true,
            LockMode::Shared => self.reader_count += 1,
        }
    }

    fn holds(&self, mode: LockMode) -> bool {
        match mode {
            LockMode::Exclusive => self.writer_active,
            LockMode::Shared => self.reader_count > 0,
        }
    }

    fn clear(&mut self, mode: LockMode) {
        match mode {
            LockMode::Exclusive => self.writer_active = false,
            LockMode::Shared => self.reader_count = self.reader_count.saturating_sub(1),
        }
    }

    /// Grant requests from the head of the queue until the head is incompatible.
    ///
    /// The head is never skipped or requeued, so grants follow arrival order.
    fn process_queue(&mut self, name: &str) {
        while let Some(head) = self.queue.front() {
            if !self.can_grant(head.mode) {
                tracing::trace!(
                    "Queue head for '{}' ({:?}) must wait, {} pending",
                    name,
                    head.mode,
                    self.queue.len()
                );
                break;
            }
            let Some(request) = self.queue.pop_front() else {
                break;
            };
            self.apply(request.mode);
            if request.grant.send(()).is_err() {
                // Waiter went away before the grant arrived.
                self.clear(request.mode);
                tracing::debug!("Dropped abandoned {:?} request on '{}'", request.mode, name);
            }
        }
    }
}

/// Mutable part of a node, guarded by the node's own mutex.
pub(crate) struct NodeState {
    pub is_directory: bool,
    pub children: BTreeMap<String, Arc<DirectoryNode>>,
    /// Holders of the file's bytes; index 0 is the authoritative copy.
    pub replicas: Vec<StorageNodeId>,
    /// Shared leaf grants since the last exclusive grant or replication.
    pub consecutive_reads: u32,
    /// Targets of copies in flight, claimed before the remote call.
    pub replicating: Vec<StorageNodeId>,
    pub lock: LockState,
}

/// One segment of the directory tree, carrying its own lock queue.
pub struct DirectoryNode {
    name: String,
    state: Mutex<NodeState>,
}

impl DirectoryNode {
    fn build(name: &str, is_directory: bool, replicas: Vec<StorageNodeId>) -> Arc<Self> {
        Arc::new(DirectoryNode {
            name: name.to_string(),
            state: Mutex::new(NodeState {
                is_directory,
                children: BTreeMap::new(),
                replicas,
                consecutive_reads: 0,
                replicating: Vec::new(),
                lock: LockState::default(),
            }),
        })
    }

    pub(crate) fn new_root() -> Arc<Self> {
        Self::build("", true, Vec::new())
    }

    pub(crate) fn new_directory(name: &str) -> Arc<Self> {
        Self::build(name, true, Vec::new())
    }

    pub(crate) fn new_file(name: &str, origin: StorageNodeId) -> Arc<Self> {
        Self::build(name, false, vec![origin])
    }

    /// Segment name; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_directory(&self) -> bool {
        self.state.lock().is_directory
    }

    pub fn child(&self, name: &str) -> Option<Arc<DirectoryNode>> {
        self.state.lock().children.get(name).cloned()
    }

    /// Names of the direct children, sorted.
    pub fn child_names(&self) -> Vec<String> {
        self.state.lock().children.keys().cloned().collect()
    }

    pub fn replicas(&self) -> Vec<StorageNodeId> {
        self.state.lock().replicas.clone()
    }

    pub fn consecutive_reads(&self) -> u32 {
        self.state.lock().consecutive_reads
    }

    /// Storage nodes a copy of this file is currently being made on.
    pub fn replicas_in_flight(&self) -> Vec<StorageNodeId> {
        self.state.lock().replicating.clone()
    }

    pub fn writer_active(&self) -> bool {
        self.state.lock().lock.writer_active
    }

    pub fn reader_count(&self) -> usize {
        self.state.lock().lock.reader_count
    }

    /// Number of requests queued behind the current holders.
    pub fn pending_requests(&self) -> usize {
        self.state.lock().lock.queue.len()
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut NodeState) -> R) -> R {
        let mut state = self.state.lock();
        f(&mut state)
    }

    /// Queue a request and grant whatever the queue allows right away.
    pub(crate) fn enqueue(self: &Arc<Self>, mode: LockMode) -> PendingGrant {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            state.lock.queue.push_back(PendingRequest { mode, grant: tx });
            state.lock.process_queue(&self.name);
        }
        PendingGrant {
            node: Arc::clone(self),
            mode,
            rx: Some(rx),
        }
    }

    /// Wait for a lock in `mode` on this node.
    pub(crate) async fn acquire(self: &Arc<Self>, mode: LockMode) -> Result<HeldLock> {
        self.enqueue(mode).wait().await
    }

    pub(crate) fn holds(&self, mode: LockMode) -> bool {
        self.state.lock().lock.holds(mode)
    }

    /// Drop queued requests whose waiter has gone away.
    fn purge_abandoned(&self) {
        let mut state = self.state.lock();
        let before = state.lock.queue.len();
        state.lock.queue.retain(|request| !request.grant.is_closed());
        if state.lock.queue.len() != before {
            state.lock.process_queue(&self.name);
        }
    }

    /// Give up one hold in `mode` and let the queue make progress.
    pub(crate) fn release(&self, mode: LockMode) -> Result<()> {
        let mut state = self.state.lock();
        if !state.lock.holds(mode) {
            return Err(ArborError::InvalidArgument(format!(
                "No {:?} lock is held on '{}'",
                mode, self.name
            )));
        }
        state.lock.clear(mode);
        state.lock.process_queue(&self.name);
        Ok(())
    }
}

/// Completion handle for a queued request.
///
/// Dropping it before the grant is observed hands a late grant straight back
/// to the queue, so a cancelled waiter never leaves the node locked.
pub(crate) struct PendingGrant {
    node: Arc<DirectoryNode>,
    mode: LockMode,
    rx: Option<oneshot::Receiver<()>>,
}

impl PendingGrant {
    pub(crate) async fn wait(mut self) -> Result<HeldLock> {
        let outcome = match self.rx.as_mut() {
            Some(rx) => rx.await,
            None => {
                return Err(ArborError::IllegalState(format!(
                    "Lock request on '{}' was already consumed",
                    self.node.name
                )))
            }
        };
        self.rx = None;
        outcome.map_err(|_| {
            ArborError::IllegalState(format!("Lock queue for '{}' was dropped", self.node.name))
        })?;
        Ok(HeldLock::new(Arc::clone(&self.node), self.mode))
    }
}

impl Drop for PendingGrant {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if rx.try_recv().is_ok() {
                if let Err(e) = self.node.release(self.mode) {
                    tracing::warn!("Failed to hand back abandoned grant: {}", e);
                }
            } else {
                self.node.purge_abandoned();
            }
        }
    }
}

/// A granted lock on one node. Released on drop unless kept.
pub(crate) struct HeldLock {
    node: Arc<DirectoryNode>,
    mode: LockMode,
    armed: bool,
}

impl HeldLock {
    fn new(node: Arc<DirectoryNode>, mode: LockMode) -> Self {
        Self {
            node,
            mode,
            armed: true,
        }
    }

    /// Leave the lock held past this guard's lifetime.
    pub(crate) fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.node.release(self.mode) {
                tracing::warn!("Failed to release lock on '{}': {}", self.node.name, e);
            }
        }
    }
}

/// Locks taken along a path, root first. Dropping releases them leaf first.
#[derive(Default)]
pub(crate) struct LockChain {
    held: Vec<HeldLock>,
}

impl LockChain {
    pub(crate) fn push(&mut self, lock: HeldLock) {
        self.held.push(lock);
    }

    pub(crate) fn keep(mut self) {
        for lock in self.held.drain(..) {
            lock.keep();
        }
    }
}

impl Drop for LockChain {
    fn drop(&mut self) {
        while let Some(lock) = self.held.pop() {
            drop(lock);
        }
    }
}
