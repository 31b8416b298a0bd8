//! Teleport orchestration.
//!
//! A teleport runs in two halves. [`begin`] executes synchronously inside the
//! caller's tick: guards, bookkeeping, companion capture and the provisional
//! teleport that makes the host start streaming the destination. The rest
//! ([`complete`]) runs as a detached local task that suspends until the
//! destination is resident, and re-checks everything it touches after each
//! suspension since the pair or the player may be gone by then.

use std::fmt;
use std::rc::Rc;

use town_portal_host::{Dimension, HostError, PlayerId, TeleportOptions, Vec3, WorldHost};
use tracing::{debug, info};

use crate::chunk_wait::await_resident;
use crate::companions::{self, CaptureSet};
use crate::error::PortalError;
use crate::registry::{PortalId, PortalRecord, PortalRole};
use crate::service::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportPhase {
    Requested,
    CooldownCheck,
    LocationResolving,
    InFlight,
    Settling,
    Complete,
}

impl fmt::Display for TeleportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TeleportPhase::Requested => "requested",
            TeleportPhase::CooldownCheck => "cooldown-check",
            TeleportPhase::LocationResolving => "location-resolving",
            TeleportPhase::InFlight => "in-flight",
            TeleportPhase::Settling => "settling",
            TeleportPhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Everything the async half needs, captured when the teleport starts.
pub(crate) struct TeleportPlan {
    player: PlayerId,
    entered: PortalRecord,
    /// Destination as it was at request time; used if the record disappears.
    destination: PortalRecord,
    capture: Option<CaptureSet>,
}

/// Start a teleport through `entered` and spawn its completion task.
///
/// Must be called from within a `LocalSet`.
pub(crate) fn request<H: WorldHost + 'static>(
    shared: &Rc<Shared<H>>,
    player: PlayerId,
    entered: PortalId,
) -> Result<(), PortalError> {
    let plan = begin(shared, player, entered)?;
    let task_shared = Rc::clone(shared);
    tokio::task::spawn_local(async move {
        complete(&task_shared, plan).await;
    });
    Ok(())
}

pub(crate) fn begin<H: WorldHost>(
    shared: &Shared<H>,
    player: PlayerId,
    entered: PortalId,
) -> Result<TeleportPlan, PortalError> {
    let now = shared.clock.now();
    debug!("Teleport of {player} via {entered}: {}", TeleportPhase::Requested);
    let (entered, destination) = {
        let state = shared.state.borrow();
        if state.teleporting.contains(&player) {
            return Err(PortalError::AlreadyTeleporting);
        }
        debug!("Teleport of {player} via {}: {}", entered, TeleportPhase::CooldownCheck);
        if let Some(until) = state.cooldown_until(player, now) {
            return Err(PortalError::OnCooldown { until });
        }
        let record = state
            .registry
            .get(entered)
            .cloned()
            .ok_or(PortalError::UnknownPortal(entered))?;
        let destination = state
            .registry
            .counterpart_of(entered)
            .cloned()
            .ok_or(PortalError::BrokenPair(entered))?;
        (record, destination)
    };
    let player_state = shared
        .host
        .player(player)
        .ok_or(HostError::PlayerOffline(player))?;

    debug!("Teleport of {player} via {}: {}", entered.id, TeleportPhase::LocationResolving);
    let stamp = {
        let mut state = shared.state.borrow_mut();
        state.teleported.insert(player);
        state.teleporting.insert(player);
        state
            .cooldowns
            .insert(player, now + shared.config.teleport_cooldown);
        state.capture_seq += 1;
        format!("{now}_{}", state.capture_seq)
    };
    let _ = shared.host.spawn_particle(
        player_state.dimension,
        &shared.config.teleport_particle,
        player_state.position,
        None,
    );
    let capture = companions::capture(
        shared.host.as_ref(),
        &player_state,
        shared.config.companion_radius,
        &stamp,
    );
    if let Err(e) = shared.host.teleport(
        player,
        destination.position,
        TeleportOptions::into_dimension(destination.dimension),
    ) {
        shared.state.borrow_mut().teleporting.remove(&player);
        if let Some(set) = &capture {
            companions::release(
                shared.host.as_ref(),
                set,
                player_state.dimension,
                player_state.position,
                shared.config.companion_radius,
            );
        }
        return Err(e.into());
    }
    Ok(TeleportPlan {
        player,
        entered,
        destination,
        capture,
    })
}

pub(crate) async fn complete<H: WorldHost>(shared: &Shared<H>, plan: TeleportPlan) {
    let TeleportPlan {
        player,
        entered,
        destination,
        capture,
    } = plan;
    let dimension = destination.dimension;

    debug!("Teleport of {player} via {}: {}", entered.id, TeleportPhase::InFlight);
    await_resident(shared, dimension, destination.position).await;

    let target = resolve_destination(shared, &destination);
    if shared.host.player(player).is_none() {
        debug!("{player} left while in flight");
        abandon(shared, player, capture.as_ref(), dimension, target);
        return;
    }
    let options = TeleportOptions::into_dimension(dimension);
    let _ = shared.host.set_movement_enabled(player, false);
    if let Err(e) = shared.host.teleport(player, target, options) {
        debug!("Corrected teleport of {player} failed: {e}");
    }
    let _ = shared
        .host
        .play_sound(dimension, &shared.config.teleport_sound, target);
    let _ = shared
        .host
        .spawn_particle(dimension, &shared.config.teleport_particle, target, None);

    if entered.role == PortalRole::Base && entered.owner == player {
        // The owner may have opened a new pair under the same link meanwhile.
        let closed = {
            let mut state = shared.state.borrow_mut();
            let still_open = state
                .registry
                .get_pair(entered.link)
                .is_some_and(|pair| pair.base == entered.id);
            still_open && !state.registry.destroy_pair(entered.link).is_empty()
        };
        if closed {
            info!("Town portal of {player} closed on return");
            shared.host.send_message(player, "Town Portal closed.");
        }
    }

    debug!("Teleport of {player} via {}: {}", entered.id, TeleportPhase::Settling);
    shared.clock.sleep(shared.config.settle_delay).await;
    if shared.host.player(player).is_none() {
        abandon(shared, player, capture.as_ref(), dimension, target);
        return;
    }
    let _ = shared.host.teleport(player, target, options);
    let _ = shared.host.set_movement_enabled(player, true);
    if let Some(set) = &capture {
        companions::restore(
            shared.host.as_ref(),
            set,
            player,
            dimension,
            target,
            shared.config.companion_radius,
        );
    }
    shared.state.borrow_mut().teleporting.remove(&player);
    debug!("Teleport of {player} via {}: {}", entered.id, TeleportPhase::Complete);
}

/// Final landing spot: the live record's position, resolving it first if
/// needed, or the request-time copy when the pair has since been destroyed.
fn resolve_destination<H: WorldHost>(shared: &Shared<H>, snapshot: &PortalRecord) -> Vec3 {
    let live = shared.state.borrow().registry.get(snapshot.id).cloned();
    match live {
        Some(record) if record.resolved => record.position,
        Some(record) => {
            let position = shared.resolve_position(&record);
            shared.state.borrow_mut().registry.resolve(record.id, position);
            position
        }
        None if snapshot.resolved => snapshot.position,
        None => shared.resolve_position(snapshot),
    }
}

/// Give up on a player who is gone; their companions are left at `position`.
fn abandon<H: WorldHost>(
    shared: &Shared<H>,
    player: PlayerId,
    capture: Option<&CaptureSet>,
    dimension: Dimension,
    position: Vec3,
) {
    if let Some(set) = capture {
        companions::release(
            shared.host.as_ref(),
            set,
            dimension,
            position,
            shared.config.companion_radius,
        );
    }
    shared.state.borrow_mut().teleporting.remove(&player);
}

