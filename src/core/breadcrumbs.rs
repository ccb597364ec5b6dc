//! Fixed-size trail of recent non-error records

use serde_json::Value as Json;
use std::collections::VecDeque;

/// Number of records kept for context
pub const BREADCRUMB_CAPACITY: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct BreadcrumbTrail {
    crumbs: VecDeque<Json>,
}

impl BreadcrumbTrail {
    pub fn new() -> Self {
        Self {
            crumbs: VecDeque::with_capacity(BREADCRUMB_CAPACITY + 1),
        }
    }

    /// Append a record, evicting the oldest once capacity is exceeded
    pub fn add(&mut self, record: Json) {
        self.crumbs.push_back(record);
        if self.crumbs.len() > BREADCRUMB_CAPACITY {
            self.crumbs.pop_front();
        }
    }

    /// Oldest-first copy of the trail
    pub fn snapshot(&self) -> Vec<Json> {
        self.crumbs.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.crumbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crumbs.is_empty()
    }
}
