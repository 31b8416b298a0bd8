//! Periodic portal scan: resolve, draw, detect players, trigger teleports.

use std::collections::HashSet;
use std::rc::Rc;

use town_portal_host::{PlayerId, Vec3, WorldHost};
use tracing::{debug, warn};

use crate::error::PortalError;
use crate::registry::PortalId;
use crate::service::Shared;
use crate::teleport;

/// Height above the portal origin at which its particle is drawn.
const DRAW_HEIGHT: f32 = 1.2;

/// Scan every portal once, in creation order.
pub(crate) fn scan<H: WorldHost + 'static>(shared: &Rc<Shared<H>>) {
    let now = shared.clock.now();
    // Players mid-teleport count as standing in a portal.
    let mut in_portal: HashSet<PlayerId> = shared.state.borrow().teleporting.clone();

    let ids = shared.state.borrow().registry.ids();
    for id in ids {
        if let Err(e) = scan_portal(shared, id, now, &mut in_portal) {
            warn!("Portal scan of {id} failed: {e}");
        }
    }

    let mut state = shared.state.borrow_mut();
    state.teleported.retain(|p| in_portal.contains(p));
    state.cooldowns.retain(|_, until| now < *until);
}

fn scan_portal<H: WorldHost + 'static>(
    shared: &Rc<Shared<H>>,
    id: PortalId,
    now: u64,
    in_portal: &mut HashSet<PlayerId>,
) -> Result<(), PortalError> {
    // Destroyed earlier in this scan.
    let Some(mut record) = shared.state.borrow().registry.get(id).cloned() else {
        return Ok(());
    };
    if !shared
        .spatial()
        .is_chunk_resident(record.dimension, record.position)
    {
        return Ok(());
    }
    if !record.resolved {
        let position = shared.resolve_position(&record);
        shared.state.borrow_mut().registry.resolve(id, position);
        if position != record.position {
            debug!("{id} settled at {position} (was {})", record.position);
        }
        record.position = position;
    }

    let _ = shared.host.spawn_particle(
        record.dimension,
        &record.color,
        record.position + Vec3::new(0.0, DRAW_HEIGHT, 0.0),
        Some(record.facing + 180.0),
    );

    let players = shared.host.players_near(
        record.dimension,
        record.position,
        shared.config.capture_radius,
    );
    for player in players {
        in_portal.insert(player.id);
        let skip = {
            let state = shared.state.borrow();
            state.teleported.contains(&player.id)
                || state.cooldown_until(player.id, now).is_some()
                || state.registry.counterpart_of(id).is_none()
        };
        if skip {
            continue;
        }
        match teleport::request(shared, player.id, id) {
            Ok(()) => debug!("{} entered {id}", player.name),
            Err(e) => debug!("{} could not use {id}: {e}", player.name),
        }
    }
    Ok(())
}
