//! Engine error types
//!
//! Most conditions the engine meets mid-pass are deliberately non-fatal: a
//! missing handler or an unresolvable call argument degrades that node and
//! is logged, while the rest of the tree is still processed. The variants
//! here are the genuinely fatal cases.

use thiserror::Error;

/// Errors that abort a synchronization pass or state-tree parse.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The dependency walk recursed past the configured limit, which means
    /// the incoming state tree is cyclic or degenerate. Aborts the current
    /// pass only; the engine stays usable.
    #[error("dependency tree exceeded maximum depth {max_depth} at node '{id}'")]
    DepthLimitExceeded {
        /// Id of the node at which the limit was hit.
        id: String,
        /// The configured recursion limit.
        max_depth: usize,
    },

    /// A state tree could not be decoded from its JSON wire form.
    #[error("failed to parse scene state: {0}")]
    Parse(#[from] serde_json::Error),
}
