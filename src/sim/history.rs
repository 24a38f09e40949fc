//! Bounded per-step history owned by the simulation core.

use std::collections::VecDeque;

use super::types::Snapshot;

/// Ordered, bounded sequence of step snapshots.
///
/// When full, the oldest snapshot is evicted first. Only the simulation core
/// appends; everyone else gets a shared reference.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl History {
    /// Creates an empty history holding at most `capacity` snapshots (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, snapshot: Snapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
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

    /// Snapshot at `index`, oldest first.
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.entries.get(index)
    }

    pub fn first(&self) -> Option<&Snapshot> {
        self.entries.front()
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.entries.back()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Snapshot> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Copies the retained snapshots into a `Vec`, oldest first.
    pub fn to_vec(&self) -> Vec<Snapshot> {
        self.entries.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Snapshot;
    type IntoIter = std::collections::vec_deque::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::PricePeriod;
    use chrono::NaiveDateTime;

    fn snap(step: usize) -> Snapshot {
        Snapshot {
            step,
            timestamp: NaiveDateTime::default(),
            dt_hours: 1.0,
            irradiance: 0.0,
            ambient_temperature: 20.0,
            wind_speed: 0.0,
            cloud_cover: 0.0,
            solar_kw: 0.0,
            wind_kw: 0.0,
            diesel_kw: 0.0,
            load_kw: 0.0,
            served_load_kw: 0.0,
            battery_kw: 0.0,
            soc: 0.5,
            grid_kw: 0.0,
            unmet_load_kw: 0.0,
            curtailed_kw: 0.0,
            buy_price: 0.8,
            sell_price: 0.56,
            period: PricePeriod::Normal,
            fuel_l: 0.0,
            fuel_cost: 0.0,
            step_cost: 0.0,
            renewable_used_kw: 0.0,
            renewable_ratio: 0.0,
            diesel_on: false,
            battery_command: 0.0,
            reward: 0.0,
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut h = History::new(3);
        for i in 0..5 {
            h.push(snap(i));
        }
        assert_eq!(h.len(), 3);
        let steps: Vec<usize> = h.iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![2, 3, 4]);
        assert_eq!(h.first().map(|s| s.step), Some(2));
        assert_eq!(h.last().map(|s| s.step), Some(4));
    }

    #[test]
    fn clear_empties() {
        let mut h = History::new(3);
        h.push(snap(0));
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.capacity(), 3);
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut h = History::new(0);
        h.push(snap(0));
        h.push(snap(1));
        assert_eq!(h.len(), 1);
        assert_eq!(h.get(0).map(|s| s.step), Some(1));
    }
}
