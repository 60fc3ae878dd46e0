//! Ordered playback queue.

use crate::error::{PlaybackError, Result};
use crate::identifier::AudioIdentifier;

/// Ordered, duplicate-friendly list of clips.
///
/// The queue knows nothing about which entry is playing; index bookkeeping
/// lives in [`PlaybackStateMachine`](crate::state_machine::PlaybackStateMachine).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioQueue {
    items: Vec<AudioIdentifier>,
}

impl AudioQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<AudioIdentifier>) -> Self {
        Self { items }
    }

    pub fn add(&mut self, item: AudioIdentifier) {
        self.items.push(item);
    }

    pub fn add_all<I: IntoIterator<Item = AudioIdentifier>>(&mut self, items: I) {
        self.items.extend(items);
    }

    /// Remove the first entry equal to `item`. Returns whether one was found.
    pub fn remove(&mut self, item: &AudioIdentifier) -> bool {
        match self.items.iter().position(|i| i == item) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn remove_at(&mut self, index: usize) -> Result<AudioIdentifier> {
        self.check_index(index)?;
        Ok(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Move the entry at `from` so that it ends up at `to`.
    ///
    /// Both indices must be in `0..len`; out-of-range values are rejected,
    /// never clamped.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
        }
        Ok(())
    }

    pub fn replace(&mut self, items: Vec<AudioIdentifier>) {
        self.items = items;
    }

    /// Copy of the current contents, safe to hand to observers.
    pub fn snapshot(&self) -> Vec<AudioIdentifier> {
        self.items.clone()
    }

    pub fn get(&self, index: usize) -> Option<&AudioIdentifier> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AudioIdentifier> {
        self.items.iter()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.items.len() {
            return Err(PlaybackError::InvalidQueueIndex {
                index,
                len: self.items.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<AudioIdentifier> {
        names.iter().map(|n| AudioIdentifier::voice(n)).collect()
    }

    #[test]
    fn add_and_snapshot_preserve_order() {
        let mut queue = AudioQueue::new();
        queue.add(AudioIdentifier::voice("a"));
        queue.add_all(ids(&["b", "a"]));
        assert_eq!(queue.snapshot(), ids(&["a", "b", "a"]));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn remove_only_first_match() {
        let mut queue = AudioQueue::from_items(ids(&["a", "b", "a"]));
        assert!(queue.remove(&AudioIdentifier::voice("a")));
        assert_eq!(queue.snapshot(), ids(&["b", "a"]));
        assert!(!queue.remove(&AudioIdentifier::voice("zzz")));
    }

    #[test]
    fn reorder_is_insertion_move() {
        let mut queue = AudioQueue::from_items(ids(&["a", "b", "c", "d"]));
        queue.reorder(0, 2).unwrap();
        assert_eq!(queue.snapshot(), ids(&["b", "c", "a", "d"]));
        queue.reorder(3, 0).unwrap();
        assert_eq!(queue.snapshot(), ids(&["d", "b", "c", "a"]));
    }

    #[test]
    fn reorder_same_index_is_noop() {
        let mut queue = AudioQueue::from_items(ids(&["a", "b"]));
        queue.reorder(1, 1).unwrap();
        assert_eq!(queue.snapshot(), ids(&["a", "b"]));
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut queue = AudioQueue::from_items(ids(&["a", "b"]));
        let err = queue.reorder(0, 5).unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::InvalidQueueIndex { index: 5, len: 2 }
        ));
        assert!(queue.remove_at(2).is_err());
        assert_eq!(queue.snapshot(), ids(&["a", "b"]));

        let mut empty = AudioQueue::new();
        assert!(empty.reorder(0, 0).is_err());
    }

    #[test]
    fn clear_and_replace() {
        let mut queue = AudioQueue::from_items(ids(&["a"]));
        queue.clear();
        assert!(queue.is_empty());
        queue.replace(ids(&["x", "y"]));
        assert_eq!(queue.get(1), Some(&AudioIdentifier::voice("y")));
    }
}
