//! Dataset Registry - Which table is bound to which upload slot
//!
//! Holds at most one [`DatasetHandle`] per [`Slot`]. A replacement overwrites
//! the previous handle for that slot only.
//!
//! Uploads into the same slot can overlap, so every upload first takes an
//! [`UploadToken`] from [`DatasetRegistry::begin_upload`]. Tokens grow
//! monotonically per slot and only the newest one may install its handle;
//! older responses are discarded.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{UploadError, UploadResult, ValidationError, ValidationResult};
use crate::models::{DatasetHandle, Slot};

/// Ticket issued when an upload into a slot starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UploadToken {
    slot: Slot,
    sequence: u64,
}

impl UploadToken {
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Slot -> dataset mapping.
#[derive(Debug, Default, Clone)]
pub struct DatasetRegistry {
    datasets: HashMap<Slot, DatasetHandle>,
    /// Latest issued sequence per slot.
    sequences: HashMap<Slot, u64>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle currently bound to `slot`, if any.
    pub fn get(&self, slot: Slot) -> Option<&DatasetHandle> {
        self.datasets.get(&slot)
    }

    /// Like [`get`](Self::get), failing with `MissingDataset`.
    pub fn require(&self, slot: Slot) -> ValidationResult<&DatasetHandle> {
        self.datasets
            .get(&slot)
            .ok_or(ValidationError::MissingDataset(slot))
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.datasets.contains_key(&slot)
    }

    /// All bound handles in slot order.
    pub fn list(&self) -> Vec<&DatasetHandle> {
        let mut handles: Vec<_> = self.datasets.values().collect();
        handles.sort_by_key(|h| h.slot);
        handles
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Bind `handle` to its slot unconditionally, returning the replaced one.
    pub fn insert(&mut self, handle: DatasetHandle) -> Option<DatasetHandle> {
        self.datasets.insert(handle.slot, handle)
    }

    /// Issue the next token for `slot`. Any token issued earlier for the same
    /// slot becomes stale.
    pub fn begin_upload(&mut self, slot: Slot) -> UploadToken {
        let sequence = self.sequences.entry(slot).or_insert(0);
        *sequence += 1;
        debug!(slot = %slot, token = *sequence, "upload started");
        UploadToken {
            slot,
            sequence: *sequence,
        }
    }

    /// True while no newer upload has started for the token's slot.
    pub fn is_current(&self, token: UploadToken) -> bool {
        self.sequences.get(&token.slot).copied() == Some(token.sequence)
    }

    /// Install `handle` if `token` is still the newest for its slot.
    ///
    /// A stale token leaves the registry untouched and returns
    /// [`UploadError::Superseded`].
    pub fn complete_upload(
        &mut self,
        token: UploadToken,
        handle: DatasetHandle,
    ) -> UploadResult<Option<DatasetHandle>> {
        if handle.slot != token.slot || !self.is_current(token) {
            debug!(slot = %token.slot, token = token.sequence, "stale upload discarded");
            return Err(UploadError::Superseded { slot: token.slot });
        }
        Ok(self.insert(handle))
    }
}
