use crate::action::TurnAction;
use crate::card::RailColor;
use crate::map::{Destination, TrainMap};
use crate::state::PlayerGameState;
use crate::strategy::Strategy;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// How many destinations a player keeps out of the offered set.
pub const DESTINATIONS_TO_CHOOSE: usize = 2;

/// The interaction boundary between the referee and one participant.
///
/// Implementations are untrusted: every call into them is made through the
/// invocation harness, so they may hang, panic, or answer nonsense without
/// affecting the game beyond their own elimination.
pub trait Player: Send {
    /// Hands the player the map, its starting rail count, and its dealt hand.
    fn setup(&mut self, map: Arc<TrainMap>, rails: u32, hand: Vec<RailColor>);

    /// Asks the player to keep [`DESTINATIONS_TO_CHOOSE`] of the offered
    /// destinations.
    fn choose_destinations(&mut self, offered: BTreeSet<Destination>) -> BTreeSet<Destination>;

    /// Asks the player for its action, given its view of the game.
    fn take_turn(&mut self, state: PlayerGameState) -> TurnAction;

    /// Delivers the cards produced by the player's draw request.
    fn receive_cards(&mut self, cards: Vec<RailColor>);

    /// Tells the player whether it won, once the game is over.
    fn win_notification(&mut self, winner: bool);
}

/// A player shared between the referee and the harness's worker threads.
pub type SharedPlayer = Arc<Mutex<dyn Player>>;

/// Wraps a player for use with the invocation harness.
pub fn share(player: impl Player + 'static) -> SharedPlayer {
    Arc::new(Mutex::new(player))
}

/// Locks a shared player, recovering the inner value if a previous call
/// panicked while holding the lock. A poisoned player is already eliminated;
/// the lock is only reacquired to deliver notifications it may ignore.
pub fn lock(player: &SharedPlayer) -> MutexGuard<'_, dyn Player + 'static> {
    match player.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A player that delegates every decision to a [`Strategy`] and otherwise
/// remembers only what the strategy needs: the map and its chosen
/// destinations.
pub struct StrategyPlayer<S: Strategy> {
    strategy: S,
    map: Option<Arc<TrainMap>>,
    chosen_destinations: BTreeSet<Destination>,
}

impl<S: Strategy> StrategyPlayer<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            map: None,
            chosen_destinations: BTreeSet::new(),
        }
    }
}

impl<S: Strategy> Player for StrategyPlayer<S> {
    fn setup(&mut self, map: Arc<TrainMap>, _rails: u32, _hand: Vec<RailColor>) {
        self.map = Some(map);
    }

    fn choose_destinations(&mut self, offered: BTreeSet<Destination>) -> BTreeSet<Destination> {
        self.chosen_destinations = self
            .strategy
            .choose_destinations(&offered, DESTINATIONS_TO_CHOOSE);
        self.chosen_destinations.clone()
    }

    fn take_turn(&mut self, state: PlayerGameState) -> TurnAction {
        let map = self
            .map
            .as_ref()
            .expect("the referee always calls setup before take_turn");
        self.strategy.pick_turn(&state, map)
    }

    fn receive_cards(&mut self, _cards: Vec<RailColor>) {}

    fn win_notification(&mut self, _winner: bool) {}
}
