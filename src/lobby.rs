//! Lobby registry: who is present, since when, and what they are doing.
//!
//! The registry is plain data. [`crate::LobbyService`] owns it behind the
//! lobby lock together with the matchmaker.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use log::{debug, info};
use tokio::time::Instant;

use crate::board::Board;
use crate::common::LobbyError;

/// Opaque, already-authenticated player identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a present player is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlayerStatus {
    Idle,
    /// Holds a pending match request.
    Requesting,
    /// Assigned to a session.
    Matched,
}

/// A present player.
#[derive(Debug, Clone)]
pub struct LobbyEntry {
    pub id: PlayerId,
    pub status: PlayerStatus,
    last_seen: Instant,
    arrival: u64,
    fleet: Option<Board>,
}

impl LobbyEntry {
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    pub fn has_fleet(&self) -> bool {
        self.fleet.is_some()
    }
}

/// Present players keyed by identity.
#[derive(Debug, Default)]
pub struct LobbyRegistry {
    entries: HashMap<PlayerId, LobbyEntry>,
    next_arrival: u64,
}

impl LobbyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers presence. Rejoining only refreshes liveness. Returns `true`
    /// for a new entry.
    pub fn join(&mut self, id: PlayerId, now: Instant) -> bool {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.last_seen = now;
            debug!("{} rejoined", id);
            return false;
        }
        let arrival = self.next_arrival;
        self.next_arrival += 1;
        info!("{} joined the lobby", id);
        self.entries.insert(
            id.clone(),
            LobbyEntry {
                id,
                status: PlayerStatus::Idle,
                last_seen: now,
                arrival,
                fleet: None,
            },
        );
        true
    }

    /// Removes an entry, returning it if it was present.
    pub fn leave(&mut self, id: &PlayerId) -> Option<LobbyEntry> {
        let entry = self.entries.remove(id);
        if entry.is_some() {
            info!("{} left the lobby", id);
        }
        entry
    }

    pub fn heartbeat(&mut self, id: &PlayerId, now: Instant) -> Result<(), LobbyError> {
        let entry = self.get_mut(id)?;
        entry.last_seen = now;
        Ok(())
    }

    pub fn get(&self, id: &PlayerId) -> Option<&LobbyEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Result<&mut LobbyEntry, LobbyError> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| LobbyError::NotPresent(id.clone()))
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn set_status(&mut self, id: &PlayerId, status: PlayerStatus) -> Result<(), LobbyError> {
        self.get_mut(id)?.status = status;
        Ok(())
    }

    /// Stores a validated fleet, replacing one not yet used.
    pub fn set_fleet(&mut self, id: &PlayerId, board: Board) -> Result<(), LobbyError> {
        self.get_mut(id)?.fleet = Some(board);
        Ok(())
    }

    /// Takes the player's fleet for a new session.
    pub fn take_fleet(&mut self, id: &PlayerId) -> Result<Board, LobbyError> {
        self.get_mut(id)?
            .fleet
            .take()
            .ok_or_else(|| LobbyError::FleetNotPlaced(id.clone()))
    }

    /// Idle players in order of arrival.
    pub fn list_idle(&self) -> Vec<PlayerId> {
        let mut idle: Vec<&LobbyEntry> = self
            .entries
            .values()
            .filter(|e| e.status == PlayerStatus::Idle)
            .collect();
        idle.sort_by_key(|e| e.arrival);
        idle.into_iter().map(|e| e.id.clone()).collect()
    }

    /// Players whose last heartbeat is older than `timeout`, oldest arrival first.
    pub fn expired(&self, now: Instant, timeout: Duration) -> Vec<PlayerId> {
        let mut stale: Vec<&LobbyEntry> = self
            .entries
            .values()
            .filter(|e| now.saturating_duration_since(e.last_seen) > timeout)
            .collect();
        stale.sort_by_key(|e| e.arrival);
        stale.into_iter().map(|e| e.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
