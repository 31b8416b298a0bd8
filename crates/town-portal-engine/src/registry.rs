//! Portal records and the links that pair them.
//!
//! Records are only ever created and destroyed two at a time, so every
//! record's link resolves to an entry naming both halves.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use town_portal_host::{Dimension, EntityId, PlayerId, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortalId(pub u64);

impl fmt::Display for PortalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "portal-{}", self.0)
    }
}

/// Shared identifier of the two records in a pair: the owner's session id.
pub type LinkId = EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalRole {
    /// Opened where the player stood.
    Field,
    /// Opened near the player's respawn point.
    Base,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortalRecord {
    pub id: PortalId,
    pub owner: PlayerId,
    pub role: PortalRole,
    pub link: LinkId,
    pub counterpart: PortalId,
    pub dimension: Dimension,
    pub position: Vec3,
    pub resolved: bool,
    pub facing: f32,
    pub color: String,
    pub created_at: u64,
}

/// Placement of one half of a new pair.
#[derive(Debug, Clone)]
pub struct PortalSpawn {
    pub dimension: Dimension,
    pub position: Vec3,
    pub resolved: bool,
    pub facing: f32,
}

/// Attributes shared by both halves of a new pair.
#[derive(Debug, Clone)]
pub struct PairAttributes {
    pub owner: PlayerId,
    pub color: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEntry {
    pub field: PortalId,
    pub base: PortalId,
}

#[derive(Default)]
pub struct PortalRegistry {
    next_id: u64,
    /// Ids are monotonic, so key order is creation order.
    records: BTreeMap<PortalId, PortalRecord>,
    links: HashMap<LinkId, LinkEntry>,
}

impl PortalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create both records of a pair and link them. Any pair already under
    /// `link` is destroyed first.
    pub fn create_pair(
        &mut self,
        link: LinkId,
        attrs: &PairAttributes,
        field: PortalSpawn,
        base: PortalSpawn,
    ) -> LinkEntry {
        self.destroy_pair(link);
        let field_id = self.allocate();
        let base_id = self.allocate();
        for (id, role, counterpart, spawn) in [
            (field_id, PortalRole::Field, base_id, field),
            (base_id, PortalRole::Base, field_id, base),
        ] {
            self.records.insert(
                id,
                PortalRecord {
                    id,
                    owner: attrs.owner,
                    role,
                    link,
                    counterpart,
                    dimension: spawn.dimension,
                    position: spawn.position,
                    resolved: spawn.resolved,
                    facing: spawn.facing,
                    color: attrs.color.clone(),
                    created_at: attrs.created_at,
                },
            );
        }
        let entry = LinkEntry {
            field: field_id,
            base: base_id,
        };
        self.links.insert(link, entry);
        entry
    }

    fn allocate(&mut self) -> PortalId {
        self.next_id += 1;
        PortalId(self.next_id)
    }

    pub fn get(&self, id: PortalId) -> Option<&PortalRecord> {
        self.records.get(&id)
    }

    pub fn get_pair(&self, link: LinkId) -> Option<LinkEntry> {
        self.links.get(&link).copied()
    }

    /// The other half of `id`'s pair, if both halves still exist.
    pub fn counterpart_of(&self, id: PortalId) -> Option<&PortalRecord> {
        let record = self.records.get(&id)?;
        self.records.get(&record.counterpart)
    }

    /// Commit a final position. Returns false if the record is gone.
    pub fn resolve(&mut self, id: PortalId, position: Vec3) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.position = position;
                record.resolved = true;
                true
            }
            None => false,
        }
    }

    /// Remove both records and the link. Returns the removed records; empty
    /// if the pair was already gone.
    pub fn destroy_pair(&mut self, link: LinkId) -> Vec<PortalRecord> {
        let Some(entry) = self.links.remove(&link) else {
            return Vec::new();
        };
        [entry.field, entry.base]
            .iter()
            .filter_map(|id| self.records.remove(id))
            .collect()
    }

    /// Record ids in creation order.
    pub fn ids(&self) -> Vec<PortalId> {
        self.records.keys().copied().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &PortalRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check the pairing invariant over the whole table.
    pub fn is_consistent(&self) -> bool {
        let records_linked = self.records.values().all(|r| {
            self.links
                .get(&r.link)
                .is_some_and(|e| e.field == r.id || e.base == r.id)
                && self
                    .records
                    .get(&r.counterpart)
                    .is_some_and(|c| c.link == r.link && c.counterpart == r.id)
        });
        let links_complete = self.links.iter().all(|(link, e)| {
            [e.field, e.base]
                .iter()
                .all(|id| self.records.get(id).is_some_and(|r| r.link == *link))
        });
        records_linked && links_complete
    }
}
