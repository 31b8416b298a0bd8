//! Keep-alive leases over host ticking areas.
//!
//! A lease is taken whenever the engine needs a far-away region streamed in
//! and is refreshed on every use. The periodic sweep releases leases that
//! have been idle too long.

use std::collections::HashMap;

use town_portal_host::{BlockPos, Dimension, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct Lease {
    pub dimension: Dimension,
    pub center: BlockPos,
    pub last_used: u64,
}

/// What the caller must tell the host after touching a lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseTouch {
    /// First use: the host needs a new ticking area under this name.
    Acquired { name: String, center: BlockPos },
    Refreshed,
}

#[derive(Default)]
pub struct LeaseTable {
    leases: HashMap<String, Lease>,
}

/// Lease name for a coordinate: `portal_loader_{x}_{y}_{z}_{dim}` on floored coordinates.
pub fn lease_name(dimension: Dimension, coord: Vec3) -> String {
    let pos = BlockPos::from_vec3(&coord);
    format!(
        "portal_loader_{}_{}_{}_{}",
        pos.x,
        pos.y,
        pos.z,
        dimension.name()
    )
}

impl LeaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&mut self, dimension: Dimension, coord: Vec3, now: u64) -> LeaseTouch {
        let name = lease_name(dimension, coord);
        if let Some(lease) = self.leases.get_mut(&name) {
            lease.last_used = now;
            return LeaseTouch::Refreshed;
        }
        let center = BlockPos::from_vec3(&coord);
        self.leases.insert(
            name.clone(),
            Lease {
                dimension,
                center,
                last_used: now,
            },
        );
        LeaseTouch::Acquired { name, center }
    }

    /// Remove leases idle for more than `idle_limit` ticks and return them
    /// so their ticking areas can be released.
    pub fn sweep(&mut self, now: u64, idle_limit: u64) -> Vec<(String, Lease)> {
        let expired: Vec<String> = self
            .leases
            .iter()
            .filter(|(_, lease)| now.saturating_sub(lease.last_used) > idle_limit)
            .map(|(name, _)| name.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|name| self.leases.remove(&name).map(|lease| (name, lease)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Lease> {
        self.leases.get(name)
    }

    pub fn len(&self) -> usize {
        self.leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    pub fn clear(&mut self) {
        self.leases.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_uses_floored_coordinates() {
        assert_eq!(
            lease_name(Dimension::Nether, Vec3::new(11.5, 64.0, -0.5)),
            "portal_loader_11_64_-1_nether"
        );
    }

    #[test]
    fn touch_acquires_once_then_refreshes() {
        let mut table = LeaseTable::new();
        let coord = Vec3::new(3.2, 70.0, 8.9);
        let first = table.touch(Dimension::Overworld, coord, 10);
        assert_eq!(
            first,
            LeaseTouch::Acquired {
                name: "portal_loader_3_70_8_overworld".into(),
                center: BlockPos::new(3, 70, 8),
            }
        );
        assert_eq!(table.touch(Dimension::Overworld, coord, 50), LeaseTouch::Refreshed);
        assert_eq!(
            table.get("portal_loader_3_70_8_overworld").unwrap().last_used,
            50
        );
    }

    #[test]
    fn sweep_evicts_only_idle_leases() {
        let mut table = LeaseTable::new();
        table.touch(Dimension::Overworld, Vec3::new(0.0, 64.0, 0.0), 0);
        table.touch(Dimension::Nether, Vec3::new(5.0, 40.0, 5.0), 300);
        assert!(table.sweep(600, 600).is_empty());
        let evicted = table.sweep(601, 600);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, "portal_loader_0_64_0_overworld");
        assert_eq!(table.len(), 1);
        assert_eq!(table.sweep(901, 600).len(), 1);
        assert!(table.is_empty());
    }
}
