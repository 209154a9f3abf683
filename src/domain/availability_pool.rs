//! Set of worker ids currently free for assignment.
//!
//! [`AvailabilityPool`] is not synchronised on its own: it lives inside the
//! [`super::WorkerRegistry`] mutex next to the worker map, so both change
//! together.

use std::collections::{HashSet, VecDeque};
use std::str::FromStr;

use rand::Rng;

use super::WorkerId;

/// How [`AvailabilityPool::take`] picks among free workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Longest-waiting free worker first.
    #[default]
    Fifo,
    /// Uniformly random free worker.
    Random,
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown selection policy: {other}")),
        }
    }
}

/// Free worker ids with set semantics.
///
/// `order` keeps insertion order for FIFO selection; `members` guards
/// against duplicates so an id is present at most once.
#[derive(Debug, Default)]
pub struct AvailabilityPool {
    order: VecDeque<WorkerId>,
    members: HashSet<WorkerId>,
    policy: SelectionPolicy,
}

impl AvailabilityPool {
    /// Creates an empty pool using `policy`.
    #[must_use]
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            policy,
        }
    }

    /// Marks `id` as free. Re-inserting an id already present is a no-op.
    ///
    /// Returns `true` if the id was newly inserted.
    pub fn put(&mut self, id: WorkerId) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        true
    }

    /// Removes and returns one free id, or `None` if the pool is empty.
    pub fn take(&mut self) -> Option<WorkerId> {
        let id = match self.policy {
            SelectionPolicy::Fifo => self.order.pop_front()?,
            SelectionPolicy::Random => {
                if self.order.is_empty() {
                    return None;
                }
                let idx = rand::rng().random_range(0..self.order.len());
                self.order.remove(idx)?
            }
        };
        self.members.remove(&id);
        Some(id)
    }

    /// Drops `id` from the pool if present.
    ///
    /// Returns `true` if the id was present.
    pub fn remove(&mut self, id: &WorkerId) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.order.retain(|candidate| candidate != id);
        true
    }

    /// Returns `true` if `id` is currently free.
    #[must_use]
    pub fn contains(&self, id: &WorkerId) -> bool {
        self.members.contains(id)
    }

    /// Returns the number of free ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if no id is free.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterates over the free ids in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkerId> {
        self.order.iter()
    }
}
