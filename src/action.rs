use crate::harness;
use crate::map::Connection;
use crate::player::{self, SharedPlayer};
use crate::state::RefereeGameState;

use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The closed set of things a player may do on its turn.
///
/// # JSON
/// Externally tagged: `"draw_cards"`, or
/// `{"acquire_connection": {...connection...}}`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnAction {
    /// Request cards from the shared draw pile.
    DrawCards,
    /// Attempt to acquire the given connection.
    AcquireConnection(Connection),
}

/// What a turn did to the game.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnResult {
    /// The state materially advanced: cards left the pile, or a connection
    /// changed hands.
    Significant,
    /// A legal draw that yielded nothing because the pile is exhausted.
    Insignificant,
    /// The action was illegal, or the player's side of it failed.
    Invalid,
}

/// Applies a turn action to the referee's state on behalf of `seat`,
/// classifying the outcome. The match is exhaustive: every action variant has
/// a defined outcome.
///
/// Drawing removes up to `cards_per_draw` cards from the pile and delivers
/// them through the harness. A failed delivery is [`TurnResult::Invalid`],
/// but the draw itself is final: cards removed from the pile stay removed.
///
/// Acquiring is all-or-nothing: an illegal request leaves the ledger and the
/// seat's holdings untouched.
pub fn apply_turn_action(
    state: &mut RefereeGameState,
    seat: usize,
    player: &SharedPlayer,
    action: TurnAction,
    cards_per_draw: usize,
    deadline: Duration,
) -> TurnResult {
    match action {
        TurnAction::DrawCards => {
            let drawn = state.draw_cards_for(seat, cards_per_draw);
            debug!("Seat {} drew {} cards.", seat, drawn.len());

            let cards = drawn.to_vec();
            let handle = player.clone();
            let delivered =
                harness::invoke(deadline, move || player::lock(&handle).receive_cards(cards));

            if delivered.is_none() {
                TurnResult::Invalid
            } else if drawn.is_empty() {
                TurnResult::Insignificant
            } else {
                TurnResult::Significant
            }
        }
        TurnAction::AcquireConnection(connection) => {
            if state.acquire_connection_for(seat, &connection) {
                debug!(
                    "Seat {} acquired the connection between {} and {}.",
                    seat,
                    connection.cities().first(),
                    connection.cities().second()
                );
                TurnResult::Significant
            } else {
                TurnResult::Invalid
            }
        }
    }
}
