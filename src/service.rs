//! Lobby service: the registry and matchmaker behind one async lock.
//!
//! Every operation that reads or writes presence, requests or the session
//! table takes the lobby lock for a short critical section. Long-polls park
//! on a oneshot receiver after releasing it. When a session lock is needed
//! as well it is always taken after the lobby lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::clock::{Clock, TokioClock};
use crate::common::LobbyError;
use crate::config::LobbyConfig;
use crate::lobby::{LobbyRegistry, PlayerId, PlayerStatus};
use crate::matchmaking::{
    AwaitOutcome, MatchAssignment, MatchToken, Matchmaker, SessionId, SessionRef, Wait,
};
use crate::placement::{random_board, validate_and_create_board};
use crate::player::ScriptedOpponent;
use crate::ship::ShipPlacement;

struct LobbyState {
    registry: LobbyRegistry,
    matchmaker: Matchmaker,
}

impl LobbyState {
    /// Removes `id` entirely: withdraws its request and forfeits its session.
    async fn depart(&mut self, id: &PlayerId) {
        self.matchmaker.cancel(id);
        if let Some(assignment) = self.matchmaker.detach(id) {
            if assignment.session.forfeit(assignment.slot).await {
                info!("{} forfeited {}", id, assignment.session.id());
            }
        }
        self.registry.leave(id);
    }
}

/// Presence, matchmaking and session lookup for connected players.
pub struct LobbyService {
    state: Mutex<LobbyState>,
    config: LobbyConfig,
    clock: Arc<dyn Clock>,
    sweep_started: AtomicBool,
    shutdown: AtomicBool,
    shutdown_signal: Notify,
}

impl LobbyService {
    pub fn new(config: LobbyConfig) -> Self {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    pub fn with_clock(config: LobbyConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(LobbyState {
                registry: LobbyRegistry::new(),
                matchmaker: Matchmaker::new(config.rules),
            }),
            config,
            clock,
            sweep_started: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            shutdown_signal: Notify::new(),
        }
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    /// Registers presence. Returns `false` if the player was already present,
    /// in which case only liveness is refreshed.
    pub async fn join(&self, id: impl Into<PlayerId>) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        state.registry.join(id.into(), now)
    }

    /// Leaves the lobby. A pending request is withdrawn and a running
    /// session is forfeited.
    pub async fn leave(&self, id: &PlayerId) -> Result<(), LobbyError> {
        let mut state = self.state.lock().await;
        if !state.registry.contains(id) {
            return Err(LobbyError::NotPresent(id.clone()));
        }
        state.depart(id).await;
        Ok(())
    }

    pub async fn heartbeat(&self, id: &PlayerId) -> Result<(), LobbyError> {
        let now = self.clock.now();
        self.state.lock().await.registry.heartbeat(id, now)
    }

    /// Idle players in arrival order.
    pub async fn list_idle(&self) -> Vec<PlayerId> {
        self.state.lock().await.registry.list_idle()
    }

    pub async fn status(&self, id: &PlayerId) -> Option<PlayerStatus> {
        self.state.lock().await.registry.get(id).map(|e| e.status)
    }

    pub async fn player_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    /// Validates a fleet and stores it for the player's next session.
    pub async fn place_fleet(&self, id: &PlayerId, fleet: &[ShipPlacement]) -> Result<(), LobbyError> {
        let board = validate_and_create_board(fleet)?;
        let mut state = self.state.lock().await;
        let entry = state.registry.get_mut(id)?;
        if entry.status == PlayerStatus::Matched {
            return Err(LobbyError::AlreadyMatched(id.clone()));
        }
        state.registry.set_fleet(id, board)?;
        debug!("{} placed a fleet", id);
        Ok(())
    }

    /// Files a match request and pairs it atomically with the oldest other
    /// pending request, if any.
    pub async fn request_match(&self, id: &PlayerId) -> Result<MatchToken, LobbyError> {
        let now = self.clock.now();
        let mut guard = self.state.lock().await;
        let LobbyState {
            registry,
            matchmaker,
        } = &mut *guard;
        registry.heartbeat(id, now)?;
        matchmaker.request(registry, id, now)
    }

    /// Long-polls for the resolution of `id`'s request.
    ///
    /// Returns at once if the request is already resolved, otherwise waits up
    /// to `timeout` without holding the lobby lock. A newer poll for the same
    /// player makes this one return [`AwaitOutcome::Timeout`] early.
    pub async fn await_match(&self, id: &PlayerId, timeout: Duration) -> Result<AwaitOutcome, LobbyError> {
        let now = self.clock.now();
        let wait = {
            let mut state = self.state.lock().await;
            state.registry.heartbeat(id, now)?;
            state.matchmaker.wait(id)?
        };
        let (waiter, rx) = match wait {
            Wait::Ready(assignment) => return Ok(AwaitOutcome::Matched(assignment)),
            Wait::Parked { waiter, rx } => (waiter, rx),
        };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(assignment)) => Ok(AwaitOutcome::Matched(assignment)),
            Ok(Err(_)) => {
                // Sender dropped: displaced by a newer poll, or the request is gone.
                let state = self.state.lock().await;
                if state.matchmaker.has_request(id) {
                    Ok(AwaitOutcome::Timeout)
                } else {
                    Err(LobbyError::NoPendingRequest(id.clone()))
                }
            }
            Err(_) => {
                let mut state = self.state.lock().await;
                state.matchmaker.release_waiter(id, waiter);
                Ok(match state.matchmaker.resolution(id)? {
                    Some(assignment) => AwaitOutcome::Matched(assignment),
                    None => AwaitOutcome::Timeout,
                })
            }
        }
    }

    /// [`await_match`](Self::await_match) with the configured timeout.
    pub async fn await_match_default(&self, id: &PlayerId) -> Result<AwaitOutcome, LobbyError> {
        self.await_match(id, self.config.await_timeout).await
    }

    /// Leaves the current session and becomes idle again. A session still in
    /// progress is forfeited. A new fleet must be placed before the next match.
    pub async fn return_to_lobby(&self, id: &PlayerId) -> Result<(), LobbyError> {
        let mut state = self.state.lock().await;
        if !state.registry.contains(id) {
            return Err(LobbyError::NotPresent(id.clone()));
        }
        let assignment = state
            .matchmaker
            .detach(id)
            .ok_or_else(|| LobbyError::NotMatched(id.clone()))?;
        if assignment.session.forfeit(assignment.slot).await {
            info!("{} abandoned {}", id, assignment.session.id());
        }
        state.registry.set_status(id, PlayerStatus::Idle)
    }

    /// Starts a game against a scripted opponent seeded with `seed`.
    pub async fn start_solo(&self, id: &PlayerId, seed: u64) -> Result<MatchAssignment, LobbyError> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let opponent_board = random_board(&mut rng)?;
        let opponent = ScriptedOpponent::from_rng(rng);
        let now = self.clock.now();

        let mut guard = self.state.lock().await;
        let LobbyState {
            registry,
            matchmaker,
        } = &mut *guard;
        matchmaker.start_solo(registry, id, opponent_board, opponent, now)
    }

    pub async fn session(&self, sid: SessionId) -> Option<SessionRef> {
        self.state.lock().await.matchmaker.session(sid)
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.matchmaker.session_count()
    }

    /// Runs one liveness pass and returns the players it removed.
    ///
    /// Each removed player is treated as having left: its request is
    /// withdrawn and its session forfeited.
    pub async fn sweep_expired(&self) -> Vec<PlayerId> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let stale = state.registry.expired(now, self.config.liveness_timeout);
        for id in &stale {
            warn!("{} missed its heartbeat; removing it", id);
            state.depart(id).await;
        }
        stale
    }

    /// Spawns the periodic liveness sweep. It runs until [`shutdown`](Self::shutdown).
    ///
    /// Only one sweep runs per service: returns `None` if it was already spawned.
    pub fn spawn_liveness_sweep(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self
            .sweep_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("liveness sweep was already spawned");
            return None;
        }
        let service = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = interval(service.config.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                // register before checking the flag so a shutdown in between is not lost
                let notified = service.shutdown_signal.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if service.is_shutdown() {
                    break;
                }
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = service.sweep_expired().await;
                        if !removed.is_empty() {
                            debug!("liveness sweep removed {} player(s)", removed.len());
                        }
                    }
                    _ = &mut notified => {}
                }
            }
            debug!("liveness sweep stopped");
        }))
    }

    /// Stops the background sweep.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.shutdown_signal.notify_waiters();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl Default for LobbyService {
    fn default() -> Self {
        Self::new(LobbyConfig::default())
    }
}
