//! Root-to-leaf lock coupling over the directory tree.

use std::sync::Arc;

use crate::error::{ArborError, Result};
use crate::naming::node::{DirectoryNode, LockChain, LockMode};
use crate::naming::path::segments;
use crate::naming::tree::DirectoryTree;

impl DirectoryTree {
    /// Lock `path` in `mode`, holding every ancestor shared.
    ///
    /// Blocks until each node along the path grants its request. If the walk
    /// fails part way (an ancestor vanished) or the future is dropped, every
    /// lock it had taken is released and nothing stays held. On success the
    /// locks stay held until a matching [`DirectoryTree::unlock`].
    pub async fn lock(&self, path: &str, mode: LockMode) -> Result<()> {
        if self.find_node(path).is_none() {
            return Err(ArborError::NotFound(path.to_string()));
        }

        let mut chain = LockChain::default();
        let mut current = Arc::clone(&self.root);
        for segment in segments(path) {
            chain.push(current.acquire(LockMode::Shared).await?);
            current = current
                .child(segment)
                .ok_or_else(|| ArborError::NotFound(path.to_string()))?;
        }
        chain.push(current.acquire(mode).await?);
        tracing::debug!("Granted {:?} lock on '{}'", mode, path);

        self.replicator.on_leaf_grant(&current, path, mode).await;
        chain.keep();
        Ok(())
    }

    /// Release a lock taken by [`DirectoryTree::lock`] with the same mode.
    ///
    /// The whole chain is checked before anything is released, then the
    /// locks are dropped leaf first. Checking and releasing are separate
    /// steps: if a racing unlock empties a segment in between, every other
    /// segment is still released and the first failure is returned.
    pub fn unlock(&self, path: &str, mode: LockMode) -> Result<()> {
        let chain = self.resolve_chain(path).ok_or_else(|| {
            ArborError::InvalidArgument(format!("Cannot unlock '{}': no such path", path))
        })?;

        let leaf = chain.len() - 1;
        let mode_at = |idx: usize| if idx == leaf { mode } else { LockMode::Shared };

        if let Some(idx) = (0..chain.len()).find(|&idx| !chain[idx].holds(mode_at(idx))) {
            return Err(ArborError::InvalidArgument(format!(
                "Cannot unlock '{}': segment {} is not held {:?}",
                path,
                idx,
                mode_at(idx)
            )));
        }

        release_chain(path, &chain, mode)?;
        tracing::debug!("Released {:?} lock on '{}'", mode, path);
        Ok(())
    }
}

/// Release `chain` leaf to root: `leaf_mode` on the last node, shared above it.
///
/// Every segment is attempted even after a failure; the first error is returned.
fn release_chain(path: &str, chain: &[Arc<DirectoryNode>], leaf_mode: LockMode) -> Result<()> {
    let leaf = chain.len().saturating_sub(1);
    let mut first_error = None;
    for (idx, node) in chain.iter().enumerate().rev() {
        let mode = if idx == leaf { leaf_mode } else { LockMode::Shared };
        if let Err(e) = node.release(mode) {
            tracing::warn!("Releasing segment {} of '{}' failed: {}", idx, path, e);
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
