use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::block::Block;

#[derive(Debug)]
struct Inner {
    blocks: VecDeque<Block>,
    dropped: u64,
    has_new: bool,
}

/// A bounded FIFO of Blocks that evicts its oldest entries when full.
///
/// Neither [`push`](BlockQueue::push) nor [`drain`](BlockQueue::drain) ever
/// waits for the other side.
#[derive(Debug)]
pub struct BlockQueue {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl BlockQueue {
    /// Creates a queue holding at most `capacity` Blocks (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                blocks: VecDeque::with_capacity(capacity),
                dropped: 0,
                has_new: false,
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, block: Block) {
        self.extend([block]);
    }

    /// Pushes every Block from `blocks` under a single lock.
    pub fn extend(&self, blocks: impl IntoIterator<Item = Block>) {
        let mut inner = self.lock();
        for block in blocks {
            if inner.blocks.len() == self.capacity {
                inner.blocks.pop_front();
                inner.dropped += 1;
            }
            inner.blocks.push_back(block);
            inner.has_new = true;
        }
    }

    /// Removes and returns up to `max` Blocks, oldest first.
    pub fn drain(&self, max: usize) -> Vec<Block> {
        let mut inner = self.lock();
        inner.has_new = false;
        let count = max.min(inner.blocks.len());
        inner.blocks.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().blocks.is_empty()
    }

    /// Whether Blocks were pushed since the last [`drain`](BlockQueue::drain).
    pub fn has_new(&self) -> bool {
        self.lock().has_new
    }

    /// Total Blocks evicted to make room for newer ones.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}
