// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::error::RecordError;
use crate::policy::ConflictRecord;

/// Number of records changed on one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ChangeCounts {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl ChangeCounts {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

impl fmt::Display for ChangeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} ~{} -{}",
            self.inserted, self.updated, self.deleted
        )
    }
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncResult {
    /// The remote collection was unchanged, its listing was skipped.
    pub fast_path: bool,
    /// Changes applied to the local store.
    pub local: ChangeCounts,
    /// Changes applied to the remote collection.
    pub remote: ChangeCounts,
    /// Conflicts the policy resolved.
    pub resolved_conflicts: usize,
    /// Conflicts left for the caller.
    pub conflicts: Vec<ConflictRecord>,
    /// Records that failed and will be retried by the next pass.
    pub errors: Vec<RecordError>,
}

impl SyncResult {
    /// Every record reached its target state.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.errors.is_empty()
    }
}
