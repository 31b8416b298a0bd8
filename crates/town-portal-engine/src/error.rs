//! Errors surfaced by portal operations.

use thiserror::Error;
use town_portal_host::HostError;

use crate::registry::PortalId;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("You can't use the portal without a home. Go find your home now!")]
    NoHome,

    #[error("You are already at home.")]
    AlreadyHome,

    #[error("Portal creation in progress...")]
    CreationInProgress,

    #[error("teleport cooldown active until tick {until}")]
    OnCooldown { until: u64 },

    #[error("player is already teleporting")]
    AlreadyTeleporting,

    #[error("portal {0} does not exist")]
    UnknownPortal(PortalId),

    #[error("portal {0} has no counterpart")]
    BrokenPair(PortalId),

    #[error("Invalid color index. Must be between 0 and {max}.")]
    InvalidColor { max: usize },

    #[error(transparent)]
    Host(#[from] HostError),
}

impl PortalError {
    /// Whether the message is meant to be shown to the player.
    pub fn is_player_facing(&self) -> bool {
        matches!(
            self,
            PortalError::NoHome
                | PortalError::AlreadyHome
                | PortalError::CreationInProgress
                | PortalError::InvalidColor { .. }
        )
    }
}
