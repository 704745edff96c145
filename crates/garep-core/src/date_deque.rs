//! Date-indexed double-ended queue used as the in-memory report cache.
//!
//! Reports normally arrive one day at a time in ascending order, so entries
//! are appended at the back and expired from the front.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Queue of `(date, value)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateDeque<T> {
    entries: VecDeque<(NaiveDate, T)>,
}

impl<T> Default for DateDeque<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<T> DateDeque<T> {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any entry is stored for `date`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.entries.iter().any(|(d, _)| *d == date)
    }

    /// First entry stored for `date`.
    pub fn get_by_date(&self, date: NaiveDate) -> Option<&(NaiveDate, T)> {
        self.entries.iter().find(|(d, _)| *d == date)
    }

    /// Append at the back.
    pub fn push_back(&mut self, date: NaiveDate, value: T) {
        self.entries.push_back((date, value));
    }

    /// Prepend at the front.
    pub fn push_front(&mut self, date: NaiveDate, value: T) {
        self.entries.push_front((date, value));
    }

    /// Remove the oldest entry.
    pub fn pop_front(&mut self) -> Option<(NaiveDate, T)> {
        self.entries.pop_front()
    }

    /// Sort ascending by date, keeping the order of same-day entries.
    pub fn sort_by_date(&mut self) {
        self.entries.make_contiguous().sort_by_key(|(d, _)| *d);
    }

    /// Drop entries older than `date` from the front.
    ///
    /// Stops at the first entry that is not older, so an unsorted queue may
    /// keep stale entries behind it; call [`Self::sort_by_date`] first.
    pub fn clear_dates_before(&mut self, date: NaiveDate) {
        while self.entries.front().is_some_and(|(d, _)| *d < date) {
            self.entries.pop_front();
        }
    }

    /// Dates present, front to back.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries.iter().map(|(d, _)| *d)
    }

    /// Entries front to back.
    pub fn iter(&self) -> impl Iterator<Item = &(NaiveDate, T)> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Extend<(NaiveDate, T)> for DateDeque<T> {
    fn extend<I: IntoIterator<Item = (NaiveDate, T)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<T> FromIterator<(NaiveDate, T)> for DateDeque<T> {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for DateDeque<T> {
    type Item = (NaiveDate, T);
    type IntoIter = std::collections::vec_deque::IntoIter<(NaiveDate, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
