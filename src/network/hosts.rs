//! Known-host tracking and ring order
//!
//! The ring is the sorted sequence of known ids. Every participant holding
//! the same snapshot computes the same successor for every member.

use super::messages::ParticipantId;
use std::collections::BTreeSet;

/// The set of participants one node has observed, always including itself.
///
/// Grows monotonically; iteration is in ring order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostSet {
    owner: ParticipantId,
    hosts: BTreeSet<ParticipantId>,
}

impl HostSet {
    pub fn new(owner: ParticipantId) -> Self {
        let mut hosts = BTreeSet::new();
        hosts.insert(owner.clone());
        Self { owner, hosts }
    }

    /// Adds `id`; returns `true` if it was not known before.
    pub fn insert(&mut self, id: ParticipantId) -> bool {
        self.hosts.insert(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.hosts.contains(id)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Sorted snapshot, as carried in discovery and session messages
    pub fn to_vec(&self) -> Vec<ParticipantId> {
        self.hosts.iter().cloned().collect()
    }

    /// Index of `id` in ring order
    pub fn position(&self, id: &ParticipantId) -> Option<usize> {
        self.hosts.iter().position(|host| host == id)
    }

    /// Successor of `id` in ring order, or `None` when `id` is unknown or
    /// the ring has a single member.
    pub fn next_after(&self, id: &ParticipantId) -> Option<&ParticipantId> {
        let index = self.position(id)?;
        let next = (index + 1) % self.hosts.len();
        if next == index {
            return None;
        }
        self.hosts.iter().nth(next)
    }

    /// Successor of the owner: where this node forwards its accumulator
    pub fn next_hop(&self) -> Option<&ParticipantId> {
        self.next_after(&self.owner)
    }

    /// Number of `ids` that are known hosts
    pub fn overlap<'a>(&self, ids: impl IntoIterator<Item = &'a ParticipantId>) -> usize {
        ids.into_iter().filter(|id| self.hosts.contains(*id)).count()
    }

    /// True when `ids` is exactly the known host set
    pub fn is_exactly(&self, ids: &BTreeSet<ParticipantId>) -> bool {
        &self.hosts == ids
    }
}
