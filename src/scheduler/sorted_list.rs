// src/scheduler/sorted_list.rs

use std::cmp::Ordering;
use std::collections::VecDeque;

/// List kept in ascending order under a comparison function.
///
/// [`poll`](Self::poll) takes the smallest element, so the comparison
/// decides what "best" means. Equal elements keep insertion order.
pub struct SortedList<T> {
    items: VecDeque<T>,
    compare: fn(&T, &T) -> Ordering,
}

impl<T> SortedList<T> {
    pub fn new(mut items: Vec<T>, compare: fn(&T, &T) -> Ordering) -> Self {
        items.sort_by(compare);
        Self {
            items: items.into(),
            compare,
        }
    }

    /// Insert `item` behind every element that does not compare greater.
    pub fn add(&mut self, item: T) {
        let compare = self.compare;
        let idx = self
            .items
            .partition_point(|existing| compare(existing, &item) != Ordering::Greater);
        self.items.insert(idx, item);
    }

    /// Remove and return the smallest element.
    pub fn poll(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Remove every element matching `pred`, returning them in order.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            if pred(&item) {
                removed.push(item);
            } else {
                kept.push_back(item);
            }
        }
        self.items = kept;
        removed
    }
}
