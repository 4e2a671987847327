use crate::action::{apply_turn_action, TurnResult};
use crate::card::{CardHand, Deck};
use crate::error::EngineError;
use crate::harness;
use crate::map::{Destination, TrainMap};
use crate::player::{self, Player, SharedPlayer};
use crate::score::{Scorer, ScoringData, StandardScorer};
use crate::state::{PlayerInventory, RefereeGameState};

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 8;
const DEFAULT_DECK_SIZE: usize = 250;

/// Tunable game parameters, with the standard rules as defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefereeConfig {
    /// How long any single call into a player may take.
    pub call_deadline: Duration,
    /// The rails each player starts with.
    pub starting_rails: u32,
    /// The cards dealt to each player during setup.
    pub starting_cards: usize,
    /// How many destinations each player is offered.
    pub destination_options: usize,
    /// How many of the offered destinations each player must keep.
    pub destinations_to_choose: usize,
    /// The cards handed out per draw request.
    pub cards_per_draw: usize,
    /// The game ends once the acting player holds this many rails or fewer.
    pub rails_floor: u32,
    /// Invalid turns a player may accumulate before being eliminated.
    pub invalid_turn_threshold: u32,
}

impl Default for RefereeConfig {
    fn default() -> Self {
        Self {
            call_deadline: Duration::from_secs(2),
            starting_rails: 45,
            starting_cards: 4,
            destination_options: 5,
            destinations_to_choose: 2,
            cards_per_draw: 2,
            rails_floor: 2,
            invalid_turn_threshold: 1,
        }
    }
}

/// One row of the final ranking.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PlayerScore {
    pub name: String,
    pub score: i32,
}

/// The outcome of a finished game: surviving players ranked by score
/// (descending, ties in seat order), and the names of the eliminated.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct GameEndReport {
    pub ranking: Vec<PlayerScore>,
    pub eliminated: BTreeSet<String>,
}

/// Produces the ordered pool of destinations players will pick from.
pub type DestinationProvider = Box<dyn Fn(&TrainMap) -> Vec<Destination>>;

/// Produces the draw pile for a game.
pub type DeckProvider = Box<dyn Fn() -> Deck>;

fn shuffled_destinations(map: &TrainMap) -> Vec<Destination> {
    let mut destinations: Vec<Destination> = map.all_destinations().into_iter().collect();
    destinations.shuffle(&mut thread_rng());
    destinations
}

/// Assembles a [`Referee`], validating the player roster.
///
/// The destination pool, the deck, and the scoring formula are injectable;
/// by default destinations are shuffled, the deck is 250 random cards, and
/// the [`StandardScorer`] applies.
pub struct RefereeBuilder {
    map: TrainMap,
    players: Vec<(String, SharedPlayer)>,
    config: RefereeConfig,
    destination_provider: DestinationProvider,
    deck_provider: DeckProvider,
    scorer: Box<dyn Scorer>,
}

impl RefereeBuilder {
    pub fn new(map: TrainMap, players: Vec<(String, SharedPlayer)>) -> Self {
        Self {
            map,
            players,
            config: RefereeConfig::default(),
            destination_provider: Box::new(shuffled_destinations),
            deck_provider: Box::new(|| Deck::random(DEFAULT_DECK_SIZE)),
            scorer: Box::new(StandardScorer),
        }
    }

    pub fn config(mut self, config: RefereeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn destination_provider(
        mut self,
        provider: impl Fn(&TrainMap) -> Vec<Destination> + 'static,
    ) -> Self {
        self.destination_provider = Box::new(provider);
        self
    }

    pub fn deck_provider(mut self, provider: impl Fn() -> Deck + 'static) -> Self {
        self.deck_provider = Box::new(provider);
        self
    }

    pub fn scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn build(self) -> Result<Referee, EngineError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players.len()) {
            return Err(EngineError::BadPlayerCount {
                min: MIN_PLAYERS,
                max: MAX_PLAYERS,
                actual: self.players.len(),
            });
        }

        let mut seen = BTreeSet::new();
        for (name, _) in &self.players {
            if !seen.insert(name.clone()) {
                return Err(EngineError::DuplicatePlayerName(name.clone()));
            }
        }

        let (names, players) = self.players.into_iter().unzip();
        Ok(Referee {
            map: Arc::new(self.map),
            names,
            players,
            config: self.config,
            destination_provider: self.destination_provider,
            deck_provider: self.deck_provider,
            scorer: self.scorer,
            eliminated: BTreeSet::new(),
        })
    }
}

/// Runs one complete game: setup, destination selection, the turn loop, and
/// end-game scoring and notifications.
///
/// Players are untrusted. Every call into one goes through the invocation
/// harness; a player that hangs, panics, or answers illegally is eliminated,
/// its owned connections stay owned, and the game continues with the rest.
pub struct Referee {
    map: Arc<TrainMap>,
    names: Vec<String>,
    players: Vec<SharedPlayer>,
    config: RefereeConfig,
    destination_provider: DestinationProvider,
    deck_provider: DeckProvider,
    scorer: Box<dyn Scorer>,
    eliminated: BTreeSet<usize>,
}

impl Referee {
    pub fn builder(map: TrainMap, players: Vec<(String, SharedPlayer)>) -> RefereeBuilder {
        RefereeBuilder::new(map, players)
    }

    /// Plays the game to completion.
    ///
    /// Fails up front when the destination pool cannot offer every player a
    /// full selection; rule violations after that point never fail the game,
    /// they eliminate the violator.
    pub fn play(mut self) -> Result<GameEndReport, EngineError> {
        let mut pool = (self.destination_provider)(&self.map);
        let needed = self.players.len() * self.config.destinations_to_choose
            + self
                .config
                .destination_options
                .saturating_sub(self.config.destinations_to_choose);
        if pool.len() < needed {
            return Err(EngineError::NotEnoughDestinations {
                available: pool.len(),
                needed,
            });
        }

        info!("Starting a game with {} players.", self.players.len());

        let mut deck = (self.deck_provider)();
        let hands = self.setup_players(&mut deck);
        let picks = self.select_destinations(&mut pool);

        let inventories = hands
            .into_iter()
            .zip(picks)
            .map(|(hand, destinations)| {
                PlayerInventory::new(hand, self.config.starting_rails, destinations)
            })
            .collect();
        let mut state = RefereeGameState::new(self.map.clone(), deck, inventories);

        self.run_turns(&mut state);
        Ok(self.conclude(&state))
    }

    /// Deals each player its starting hand and hands over the map and rail
    /// count. The deal only commits once the player's `setup` call returns;
    /// a hand offered to an unresponsive player stays in the deck.
    fn setup_players(&mut self, deck: &mut Deck) -> Vec<CardHand> {
        let mut hands = Vec::with_capacity(self.players.len());

        for seat in 0..self.players.len() {
            let offered = deck.peek_up_to(self.config.starting_cards).to_vec();
            let map = self.map.clone();
            let rails = self.config.starting_rails;
            let hand = offered.clone();

            let delivered =
                self.invoke_seat(seat, move |player| player.setup(map, rails, hand));
            if delivered.is_some() {
                deck.draw_up_to(self.config.starting_cards);
                hands.push(CardHand::from_cards(offered));
            } else {
                self.eliminate(seat, "did not complete setup");
                hands.push(CardHand::new());
            }
        }

        hands
    }

    /// Offers each surviving player a window into the destination pool and
    /// records its picks. A selection of the wrong size, or one containing a
    /// destination that was never offered, eliminates the player and leaves
    /// the pool untouched.
    fn select_destinations(&mut self, pool: &mut Vec<Destination>) -> Vec<BTreeSet<Destination>> {
        let mut picks = vec![BTreeSet::new(); self.players.len()];

        for seat in 0..self.players.len() {
            if self.eliminated.contains(&seat) {
                continue;
            }

            let offered: BTreeSet<Destination> = pool
                .iter()
                .take(self.config.destination_options)
                .cloned()
                .collect();
            let sent = offered.clone();
            let chosen = self.invoke_seat(seat, move |player| player.choose_destinations(sent));

            match chosen {
                Some(chosen)
                    if chosen.len() == self.config.destinations_to_choose
                        && chosen.is_subset(&offered) =>
                {
                    pool.retain(|destination| !chosen.contains(destination));
                    picks[seat] = chosen;
                }
                _ => self.eliminate(seat, "made an illegal destination selection"),
            }
        }

        picks
    }

    /// The turn loop. Before each turn it checks, in order: enough players
    /// remain, not every remaining player just played an insignificant turn,
    /// and the acting player still has rails to spare.
    fn run_turns(&mut self, state: &mut RefereeGameState) {
        let num_seats = state.num_seats();
        let mut strikes = vec![0u32; num_seats];
        let mut consecutive_insignificant = 0;

        let mut seat = match self.next_active_seat(0) {
            Some(seat) => seat,
            None => return,
        };
        loop {
            let active = num_seats - self.eliminated.len();
            if active < 2 {
                info!("Too few players remain to continue.");
                return;
            }
            if consecutive_insignificant >= active {
                info!("Every remaining player played an insignificant turn; game over.");
                return;
            }
            if state.rails_of(seat) <= self.config.rails_floor {
                info!(
                    "{} is down to {} rails; game over.",
                    self.names[seat],
                    state.rails_of(seat)
                );
                return;
            }

            match self.take_turn(state, seat) {
                TurnResult::Significant => {
                    strikes[seat] = 0;
                    consecutive_insignificant = 0;
                }
                TurnResult::Insignificant => {
                    strikes[seat] = 0;
                    consecutive_insignificant += 1;
                }
                TurnResult::Invalid => {
                    strikes[seat] += 1;
                    if strikes[seat] >= self.config.invalid_turn_threshold {
                        self.eliminate(seat, "played an invalid turn");
                        // An elimination changes the game materially.
                        consecutive_insignificant = 0;
                    }
                }
            }

            seat = match self.next_active_seat(seat + 1) {
                Some(next) => next,
                None => return,
            };
        }
    }

    fn take_turn(&self, state: &mut RefereeGameState, seat: usize) -> TurnResult {
        let snapshot = state.snapshot_for(seat);
        let action = self.invoke_seat(seat, move |player| player.take_turn(snapshot));

        match action {
            None => TurnResult::Invalid,
            Some(action) => {
                debug!("{} plays {:?}.", self.names[seat], action);
                apply_turn_action(
                    state,
                    seat,
                    &self.players[seat],
                    action,
                    self.config.cards_per_draw,
                    self.config.call_deadline,
                )
            }
        }
    }

    /// Scores the survivors, ranks them, and notifies every player of the
    /// outcome. Eliminated players are told they lost; a notification that
    /// fails is ignored, the player is out of moves anyway.
    fn conclude(&self, state: &RefereeGameState) -> GameEndReport {
        let survivors: Vec<usize> = (0..self.players.len())
            .filter(|seat| !self.eliminated.contains(seat))
            .collect();

        let data: Vec<ScoringData> = survivors
            .iter()
            .map(|&seat| ScoringData {
                owned: state.ledger().owned_by(seat),
                destinations: state.destinations_of(seat),
            })
            .collect();
        let scores = self.scorer.score(&data);

        let mut ranking: Vec<PlayerScore> = survivors
            .iter()
            .zip(&scores)
            .map(|(&seat, &score)| PlayerScore {
                name: self.names[seat].clone(),
                score,
            })
            .collect();
        // A stable sort keeps tied players in seat order.
        ranking.sort_by(|a, b| b.score.cmp(&a.score));
        let best = ranking.first().map(|top| top.score);

        let mut won = vec![false; self.players.len()];
        for (&seat, &score) in survivors.iter().zip(&scores) {
            won[seat] = Some(score) == best;
        }
        for (seat, winner) in won.into_iter().enumerate() {
            let _ = self.invoke_seat(seat, move |player| player.win_notification(winner));
        }

        info!("Game over: {:?}.", ranking);
        GameEndReport {
            ranking,
            eliminated: self
                .eliminated
                .iter()
                .map(|&seat| self.names[seat].clone())
                .collect(),
        }
    }

    /// Calls into a seat's player through the invocation harness.
    fn invoke_seat<T, F>(&self, seat: usize, call: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn Player) -> T + Send + 'static,
    {
        let player = self.players[seat].clone();
        harness::invoke(self.config.call_deadline, move || {
            call(&mut *player::lock(&player))
        })
    }

    fn eliminate(&mut self, seat: usize, reason: &str) {
        warn!("Eliminating {}: {}.", self.names[seat], reason);
        self.eliminated.insert(seat);
    }

    /// The first non-eliminated seat at or after `from`, wrapping around.
    fn next_active_seat(&self, from: usize) -> Option<usize> {
        let num_seats = self.players.len();
        (from..from + num_seats)
            .map(|seat| seat % num_seats)
            .find(|seat| !self.eliminated.contains(seat))
    }
}
