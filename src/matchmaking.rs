//! Match requests, pairing and long-poll waiter bookkeeping.
//!
//! [`Matchmaker`] is plain data mutated under the lobby lock, so every pairing
//! decision happens in one critical section and a player can be paired into
//! at most one session. Waiting for a resolution happens outside the lock on
//! a oneshot receiver handed out by [`Matchmaker::wait`].

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::{oneshot, Mutex, MutexGuard};
use tokio::time::Instant;

use crate::board::Board;
use crate::common::{FireError, LobbyError, ShotOutcome};
use crate::config::SessionRules;
use crate::coord::Coord;
use crate::game::{GameSession, PlayerSlot, SessionSnapshot, SessionStatus};
use crate::lobby::{LobbyRegistry, PlayerId, PlayerStatus};
use crate::player::ScriptedOpponent;

/// Identifier of a session created by the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Shared handle to a live session.
///
/// Both paired players hold a clone. The session has its own lock; firing
/// never touches the lobby lock.
#[derive(Clone)]
pub struct SessionRef {
    id: SessionId,
    players: [Option<PlayerId>; 2],
    game: Arc<Mutex<GameSession>>,
}

impl SessionRef {
    fn new(id: SessionId, players: [Option<PlayerId>; 2], game: GameSession) -> Self {
        Self {
            id,
            players,
            game: Arc::new(Mutex::new(game)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Player identities in slot order; `None` marks a scripted seat.
    pub fn players(&self) -> &[Option<PlayerId>; 2] {
        &self.players
    }

    pub fn slot_of(&self, player: &PlayerId) -> Option<PlayerSlot> {
        [PlayerSlot::A, PlayerSlot::B]
            .into_iter()
            .find(|slot| self.players[slot.index()].as_ref() == Some(player))
    }

    pub async fn fire(&self, slot: PlayerSlot, at: Coord) -> Result<ShotOutcome, FireError> {
        self.game.lock().await.fire(slot, at)
    }

    pub async fn forfeit(&self, slot: PlayerSlot) -> bool {
        self.game.lock().await.forfeit(slot)
    }

    pub async fn status(&self) -> SessionStatus {
        self.game.lock().await.status()
    }

    pub async fn snapshot(&self, viewer: PlayerSlot) -> SessionSnapshot {
        self.game.lock().await.snapshot(viewer)
    }

    /// Direct access for callers that need several reads under one lock.
    pub async fn lock(&self) -> MutexGuard<'_, GameSession> {
        self.game.lock().await
    }
}

impl PartialEq for SessionRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.game, &other.game)
    }
}

impl Eq for SessionRef {}

impl fmt::Debug for SessionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRef")
            .field("id", &self.id)
            .field("players", &self.players)
            .finish()
    }
}

/// What a resolved request tells one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAssignment {
    pub session: SessionRef,
    pub slot: PlayerSlot,
    /// `None` when the opponent is scripted.
    pub opponent: Option<PlayerId>,
}

/// Receipt for a pending match request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchToken {
    pub player: PlayerId,
    pub ticket: u64,
    pub created_at: Instant,
}

/// Result of one long-poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwaitOutcome {
    Matched(MatchAssignment),
    /// Nothing yet; poll again.
    Timeout,
}

struct PendingRequest {
    token: MatchToken,
    resolution: Option<MatchAssignment>,
    waiter: Option<(u64, oneshot::Sender<MatchAssignment>)>,
}

/// Outcome of registering a long-poll.
pub(crate) enum Wait {
    Ready(MatchAssignment),
    Parked {
        waiter: u64,
        rx: oneshot::Receiver<MatchAssignment>,
    },
}

/// Pending requests, the unresolved queue and live sessions.
pub struct Matchmaker {
    rules: SessionRules,
    requests: HashMap<PlayerId, PendingRequest>,
    queue: VecDeque<PlayerId>,
    sessions: HashMap<SessionId, SessionRef>,
    next_ticket: u64,
    next_session: u64,
    next_waiter: u64,
}

impl Matchmaker {
    pub fn new(rules: SessionRules) -> Self {
        Self {
            rules,
            requests: HashMap::new(),
            queue: VecDeque::new(),
            sessions: HashMap::new(),
            next_ticket: 0,
            next_session: 0,
            next_waiter: 0,
        }
    }

    /// Files a match request for `id` and pairs it with the oldest other
    /// waiting request if there is one.
    ///
    /// The earlier requester takes slot A. Repeating the call while still
    /// waiting returns the existing token.
    pub fn request(
        &mut self,
        registry: &mut LobbyRegistry,
        id: &PlayerId,
        now: Instant,
    ) -> Result<MatchToken, LobbyError> {
        let entry = registry
            .get(id)
            .ok_or_else(|| LobbyError::NotPresent(id.clone()))?;
        match entry.status {
            PlayerStatus::Matched => return Err(LobbyError::AlreadyMatched(id.clone())),
            PlayerStatus::Requesting => {
                if let Some(pending) = self.requests.get(id) {
                    return Ok(pending.token.clone());
                }
            }
            PlayerStatus::Idle => {}
        }
        if !entry.has_fleet() {
            return Err(LobbyError::FleetNotPlaced(id.clone()));
        }

        let token = self.issue_token(id, now);
        self.requests.insert(
            id.clone(),
            PendingRequest {
                token: token.clone(),
                resolution: None,
                waiter: None,
            },
        );
        registry.set_status(id, PlayerStatus::Requesting)?;

        match self.queue.iter().position(|p| p != id) {
            Some(pos) => {
                if let Some(partner) = self.queue.remove(pos) {
                    self.pair(registry, partner, id.clone())?;
                }
            }
            None => {
                debug!("{} is waiting for an opponent", id);
                self.queue.push_back(id.clone());
            }
        }
        Ok(token)
    }

    fn issue_token(&mut self, id: &PlayerId, now: Instant) -> MatchToken {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        MatchToken {
            player: id.clone(),
            ticket,
            created_at: now,
        }
    }

    fn next_session_id(&mut self) -> SessionId {
        let id = SessionId(self.next_session);
        self.next_session += 1;
        id
    }

    fn pair(
        &mut self,
        registry: &mut LobbyRegistry,
        first: PlayerId,
        second: PlayerId,
    ) -> Result<(), LobbyError> {
        let board_a = registry.take_fleet(&first)?;
        let board_b = match registry.take_fleet(&second) {
            Ok(board) => board,
            Err(e) => {
                registry.set_fleet(&first, board_a)?;
                self.queue.push_front(first);
                return Err(e);
            }
        };

        let sid = self.next_session_id();
        let game = GameSession::human_vs_human(board_a, board_b, self.rules);
        let session = SessionRef::new(sid, [Some(first.clone()), Some(second.clone())], game);
        self.sessions.insert(sid, session.clone());

        self.resolve(
            &first,
            MatchAssignment {
                session: session.clone(),
                slot: PlayerSlot::A,
                opponent: Some(second.clone()),
            },
        );
        self.resolve(
            &second,
            MatchAssignment {
                session,
                slot: PlayerSlot::B,
                opponent: Some(first.clone()),
            },
        );
        registry.set_status(&first, PlayerStatus::Matched)?;
        registry.set_status(&second, PlayerStatus::Matched)?;
        info!("paired {} and {} into {}", first, second, sid);
        Ok(())
    }

    fn resolve(&mut self, id: &PlayerId, assignment: MatchAssignment) {
        if let Some(pending) = self.requests.get_mut(id) {
            if let Some((_, tx)) = pending.waiter.take() {
                let _ = tx.send(assignment.clone());
            }
            pending.resolution = Some(assignment);
        }
    }

    /// Starts a session against a scripted opponent from the player's fleet.
    ///
    /// A pending multiplayer request is withdrawn first.
    pub fn start_solo(
        &mut self,
        registry: &mut LobbyRegistry,
        id: &PlayerId,
        opponent_board: Board,
        opponent: ScriptedOpponent,
        now: Instant,
    ) -> Result<MatchAssignment, LobbyError> {
        let entry = registry
            .get(id)
            .ok_or_else(|| LobbyError::NotPresent(id.clone()))?;
        if entry.status == PlayerStatus::Matched {
            return Err(LobbyError::AlreadyMatched(id.clone()));
        }
        if !entry.has_fleet() {
            return Err(LobbyError::FleetNotPlaced(id.clone()));
        }
        self.cancel(id);
        let board = registry.take_fleet(id)?;

        let sid = self.next_session_id();
        let game = GameSession::single_player(board, opponent_board, opponent, self.rules);
        let session = SessionRef::new(sid, [Some(id.clone()), None], game);
        self.sessions.insert(sid, session.clone());

        let assignment = MatchAssignment {
            session,
            slot: PlayerSlot::A,
            opponent: None,
        };
        let token = self.issue_token(id, now);
        self.requests.insert(
            id.clone(),
            PendingRequest {
                token,
                resolution: Some(assignment.clone()),
                waiter: None,
            },
        );
        registry.set_status(id, PlayerStatus::Matched)?;
        info!("{} started {} against a scripted opponent", id, sid);
        Ok(assignment)
    }

    /// Registers a long-poll for `id`.
    ///
    /// A newer poll displaces an older one, whose receiver then closes.
    pub(crate) fn wait(&mut self, id: &PlayerId) -> Result<Wait, LobbyError> {
        let pending = self
            .requests
            .get_mut(id)
            .ok_or_else(|| LobbyError::NoPendingRequest(id.clone()))?;
        if let Some(assignment) = &pending.resolution {
            return Ok(Wait::Ready(assignment.clone()));
        }
        let (tx, rx) = oneshot::channel();
        let waiter = self.next_waiter;
        self.next_waiter += 1;
        if pending.waiter.replace((waiter, tx)).is_some() {
            debug!("{} displaced an earlier long-poll", id);
        }
        Ok(Wait::Parked { waiter, rx })
    }

    /// Drops the waiter registration if it is still the current one.
    pub(crate) fn release_waiter(&mut self, id: &PlayerId, waiter: u64) {
        if let Some(pending) = self.requests.get_mut(id) {
            if matches!(&pending.waiter, Some((w, _)) if *w == waiter) {
                pending.waiter = None;
            }
        }
    }

    /// Current resolution of `id`'s request.
    pub fn resolution(&self, id: &PlayerId) -> Result<Option<MatchAssignment>, LobbyError> {
        self.requests
            .get(id)
            .map(|p| p.resolution.clone())
            .ok_or_else(|| LobbyError::NoPendingRequest(id.clone()))
    }

    pub fn has_request(&self, id: &PlayerId) -> bool {
        self.requests.contains_key(id)
    }

    /// Withdraws an unresolved request. Resolved requests cannot be cancelled.
    pub fn cancel(&mut self, id: &PlayerId) -> bool {
        match self.requests.get(id) {
            Some(pending) if pending.resolution.is_none() => {
                self.requests.remove(id);
                self.queue.retain(|p| p != id);
                info!("{} withdrew its match request", id);
                true
            }
            _ => false,
        }
    }

    /// Releases `id` from its session and returns the assignment it held.
    ///
    /// The session is dropped from the table once no player is attached.
    pub fn detach(&mut self, id: &PlayerId) -> Option<MatchAssignment> {
        let assignment = self.requests.get(id)?.resolution.clone()?;
        self.requests.remove(id);
        let sid = assignment.session.id();
        let attached = self.requests.values().any(|p| {
            p.resolution
                .as_ref()
                .is_some_and(|a| a.session.id() == sid)
        });
        if !attached {
            self.sessions.remove(&sid);
            debug!("{} has no players left", sid);
        }
        Some(assignment)
    }

    pub fn session(&self, sid: SessionId) -> Option<SessionRef> {
        self.sessions.get(&sid).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Requests still waiting for an opponent.
    pub fn waiting(&self) -> usize {
        self.queue.len()
    }
}

impl fmt::Debug for Matchmaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matchmaker")
            .field("requests", &self.requests.len())
            .field("waiting", &self.queue.len())
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
