use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, PoisonError},
};

use crate::{error::StoreError, image::Image};

/// A source frame together with both filter stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFrame {
    pub index: u64,
    pub original: Image,
    pub stage1: Image,
    pub stage2: Image,
}

/// Completed frames keyed by sequence index. Insertion order carries no meaning;
/// consumers read back through [`ResultStore::into_ordered`].
#[derive(Debug, Default)]
pub struct ResultStore {
    frames: Mutex<HashMap<u64, ProcessedFrame>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, frame: ProcessedFrame) -> Result<(), StoreError> {
        let mut frames = self.lock();
        if frames.contains_key(&frame.index) {
            return Err(StoreError::DuplicateIndex(frame.index));
        }
        frames.insert(frame.index, frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, index: u64) -> bool {
        self.lock().contains_key(&index)
    }

    /// Stored indices, ascending.
    pub fn indices(&self) -> Vec<u64> {
        let mut indices: Vec<u64> = self.lock().keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Indices in `0..total` that have no entry.
    pub fn missing(&self, total: u64) -> Vec<u64> {
        let frames = self.lock();
        (0..total).filter(|i| !frames.contains_key(i)).collect()
    }

    /// Consumes the store, returning frames in sequence order.
    pub fn into_ordered(self) -> Vec<ProcessedFrame> {
        let frames = self.frames.into_inner().unwrap_or_else(PoisonError::into_inner);
        frames
            .into_iter()
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, ProcessedFrame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
