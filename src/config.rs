use std::time::Duration;

use crate::game::PlayerSlot;
use crate::ship::ShipType;

pub const BOARD_SIZE: u8 = 10;
pub const NUM_SHIPS: usize = 5;
pub const FLEET: [ShipType; NUM_SHIPS] = [
    ShipType::Carrier,
    ShipType::Battleship,
    ShipType::Cruiser,
    ShipType::Submarine,
    ShipType::Destroyer,
];

/// Total number of ship segments in a full fleet.
pub const TOTAL_SHIP_CELLS: usize = 5 + 4 + 3 + 3 + 2;

/// Rules fixed for the lifetime of one game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionRules {
    /// Slot allowed to fire while the session is awaiting its first move.
    pub first_mover: PlayerSlot,
    /// Keep the shooter on move after a hit instead of alternating.
    pub extra_turn_on_hit: bool,
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            first_mover: PlayerSlot::A,
            extra_turn_on_hit: false,
        }
    }
}

/// Tunables for the lobby and matchmaking service.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// An entry with no heartbeat for longer than this is treated as departed.
    pub liveness_timeout: Duration,
    /// Period of the background liveness sweep.
    pub sweep_interval: Duration,
    /// Long-poll bound used by callers that do not pick their own.
    pub await_timeout: Duration,
    /// Rules applied to every session the lobby creates.
    pub rules: SessionRules,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            liveness_timeout: Duration::from_secs(45),
            sweep_interval: Duration::from_secs(10),
            await_timeout: Duration::from_secs(25),
            rules: SessionRules::default(),
        }
    }
}
