//! Battleship engine with a lobby and matchmaking service.
//!
//! The engine half ([`placement`], [`board`], [`game`]) is synchronous and
//! deterministic. The lobby half ([`LobbyService`]) runs on tokio and hands
//! out shared [`SessionRef`] handles to paired players.

mod ai;
pub mod board;
mod clock;
mod common;
mod config;
mod coord;
pub mod game;
mod grid;
mod lobby;
mod logging;
mod matchmaking;
pub mod placement;
mod player;
mod service;
mod ship;
pub mod ui;

pub use ai::*;
pub use board::*;
pub use clock::*;
pub use common::*;
pub use config::*;
pub use coord::*;
pub use game::*;
pub use grid::{CellSet, Cells};
pub use lobby::*;
pub use logging::{init_logging, init_logging_with};
pub use matchmaking::*;
pub use placement::*;
pub use player::*;
pub use service::LobbyService;
pub use ship::*;
