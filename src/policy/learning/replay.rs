//! Bounded experience replay.

use std::collections::VecDeque;

use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

/// One stored transition with the action as a discrete index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: Vec<f64>,
    pub action: usize,
    pub reward: f64,
    pub next_state: Vec<f64>,
    pub done: bool,
}

/// FIFO buffer of fixed capacity; the oldest experience is dropped first.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    entries: VecDeque<Experience>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    pub fn push(&mut self, experience: Experience) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(experience);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Draws `amount` distinct experiences uniformly.
    ///
    /// Returns fewer when the buffer holds fewer than `amount`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, amount: usize) -> Vec<&Experience> {
        let amount = amount.min(self.entries.len());
        index::sample(rng, self.entries.len(), amount)
            .into_iter()
            .filter_map(|i| self.entries.get(i))
            .collect()
    }
}
