//! Waiting for regions to stream in.

use town_portal_host::{Dimension, Vec3, WorldHost};
use tracing::{debug, warn};

use crate::leases::LeaseTouch;
use crate::service::Shared;

/// Suspend until the chunk holding `coord` is resident. Returns at once if it
/// already is; otherwise polls every `poll_interval` ticks, without limit.
pub(crate) async fn await_resident<H: WorldHost>(shared: &Shared<H>, dimension: Dimension, coord: Vec3) {
    while !shared.spatial().is_chunk_resident(dimension, coord) {
        shared.clock.sleep(shared.config.poll_interval).await;
    }
}

/// Keep the region around `coord` alive and wait for it, giving up after
/// `max_load_attempts` polls. Returns whether the region became resident.
pub(crate) async fn ensure_loaded<H: WorldHost>(shared: &Shared<H>, dimension: Dimension, coord: Vec3) -> bool {
    for _ in 0..shared.config.max_load_attempts {
        touch_lease(shared, dimension, coord);
        if shared.spatial().is_chunk_resident(dimension, coord) {
            return true;
        }
        shared.clock.sleep(shared.config.poll_interval).await;
    }
    warn!(
        "Region at {coord} in {dimension} still not loaded after {} attempts, continuing",
        shared.config.max_load_attempts
    );
    false
}

/// Refresh the lease for `coord`, creating its ticking area on first use.
pub(crate) fn touch_lease<H: WorldHost>(shared: &Shared<H>, dimension: Dimension, coord: Vec3) {
    let now = shared.clock.now();
    let touch = shared.state.borrow_mut().leases.touch(dimension, coord, now);
    if let LeaseTouch::Acquired { name, center } = touch {
        debug!("Acquired lease {name}");
        if let Err(e) = shared
            .host
            .add_ticking_area(dimension, &name, center, shared.config.lease_radius)
        {
            warn!("Failed to add ticking area {name}: {e}");
        }
    }
}

/// Release leases that have been idle past the configured limit.
pub(crate) fn sweep_leases<H: WorldHost>(shared: &Shared<H>) {
    let now = shared.clock.now();
    let expired = shared
        .state
        .borrow_mut()
        .leases
        .sweep(now, shared.config.lease_idle_ticks);
    for (name, lease) in expired {
        debug!("Lease {name} idle since tick {}, releasing", lease.last_used);
        if let Err(e) = shared.host.remove_ticking_area(lease.dimension, &name) {
            debug!("Ticking area {name} already gone: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use town_portal_host::BlockPos;
    use town_portal_sim::{SimSettings, SimWorld};

    use super::*;
    use crate::config::PortalConfig;

    fn shared(stream_delay_ticks: u64, max_load_attempts: u32) -> Rc<Shared<SimWorld>> {
        let world = SimWorld::new(SimSettings {
            stream_delay_ticks,
            ..SimSettings::default()
        });
        let config = PortalConfig {
            max_load_attempts,
            ..PortalConfig::default()
        };
        Rc::new(Shared::new(Rc::new(world), config))
    }

    async fn tick(shared: &Shared<SimWorld>) {
        shared.host.advance_tick();
        shared.clock.advance();
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn resident_region_returns_immediately() {
        let shared = shared(0, 100);
        shared
            .host
            .load_area(Dimension::Overworld, BlockPos::new(0, 64, 0), 0);
        await_resident(&shared, Dimension::Overworld, Vec3::new(1.0, 64.0, 1.0)).await;
        assert!(ensure_loaded(&shared, Dimension::Overworld, Vec3::new(1.0, 64.0, 1.0)).await);
        assert_eq!(shared.clock.now(), 0);
    }

    #[tokio::test]
    async fn ensure_loaded_streams_through_lease() {
        let shared = shared(12, 100);
        let done = Rc::new(Cell::new(None));
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (s, d) = (shared.clone(), done.clone());
                tokio::task::spawn_local(async move {
                    let loaded = ensure_loaded(&s, Dimension::Nether, Vec3::new(200.0, 40.0, -80.0)).await;
                    d.set(Some((loaded, s.clock.now())));
                });
                for _ in 0..30 {
                    tick(&shared).await;
                }
            })
            .await;
        // Lease taken at tick 1, area requested at tick 2 and resident at 14,
        // seen by the poll at tick 16.
        assert_eq!(done.get(), Some((true, 16)));
        assert_eq!(
            shared.host.ticking_area_names(),
            vec!["portal_loader_200_40_-80_nether"]
        );
    }

    #[tokio::test]
    async fn ensure_loaded_gives_up() {
        let shared = shared(10_000, 3);
        let done = Rc::new(Cell::new(None));
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (s, d) = (shared.clone(), done.clone());
                tokio::task::spawn_local(async move {
                    let loaded = ensure_loaded(&s, Dimension::Overworld, Vec3::new(500.0, 64.0, 500.0)).await;
                    d.set(Some((loaded, s.clock.now())));
                });
                for _ in 0..20 {
                    tick(&shared).await;
                }
            })
            .await;
        assert_eq!(done.get(), Some((false, 16)));
    }

    #[test]
    fn sweep_releases_ticking_areas() {
        let shared = shared(0, 100);
        touch_lease(&shared, Dimension::TheEnd, Vec3::new(4.0, 50.0, 4.0));
        assert_eq!(shared.host.ticking_area_names().len(), 1);
        for _ in 0..601 {
            shared.clock.advance();
        }
        sweep_leases(&shared);
        assert!(shared.host.ticking_area_names().is_empty());
        assert!(shared.state.borrow().leases.is_empty());
    }
}
