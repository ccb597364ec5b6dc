//! Overflow policies for per-category buffers
//!
//! Every category buffer is capped at `maximum_buffer_size`. When an append
//! (or a requeue after a failed flush) pushes it past the cap, the policy
//! decides which end gives way.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Policy for handling buffer overflow
///
/// # Example
///
/// ```
/// use client_telemetry::OverflowPolicy;
///
/// // Default behavior: keep the oldest records, drop the newest
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::DropNewest);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Truncate from the tail: the buffer keeps its oldest records
    #[default]
    DropNewest,

    /// Evict from the head: the buffer keeps its newest records
    DropOldest,
}

impl OverflowPolicy {
    /// Bring `buffer` back under `cap`, returning how many records were dropped
    pub fn enforce<T>(&self, buffer: &mut VecDeque<T>, cap: usize) -> usize {
        let excess = buffer.len().saturating_sub(cap);
        if excess == 0 {
            return 0;
        }

        match self {
            OverflowPolicy::DropNewest => buffer.truncate(cap),
            OverflowPolicy::DropOldest => {
                buffer.drain(..excess);
            }
        }
        excess
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called with the category name and the total count of records dropped
/// for overflow so far.
pub type OverflowCallback = Arc<dyn Fn(&str, u64) + Send + Sync>;
