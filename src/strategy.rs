use crate::action::TurnAction;
use crate::card::RailColor;
use crate::map::{CityPair, Connection, Destination, TrainMap};
use crate::state::PlayerGameState;

use std::collections::BTreeSet;

/// How many cards [`Hold10`] accumulates before it starts acquiring.
const CARD_HOLD_THRESHOLD: u32 = 10;

/// A pluggable decision policy: which destinations to keep, and what to do on
/// a turn.
///
/// Every method is a pure function of its arguments. Identical inputs must
/// yield identical outputs, so that independently written components agree on
/// a strategy's behavior.
pub trait Strategy: Send {
    /// Keeps `count` of the offered destinations.
    fn choose_destinations(
        &self,
        offered: &BTreeSet<Destination>,
        count: usize,
    ) -> BTreeSet<Destination>;

    /// Whether this strategy would rather acquire a connection than draw.
    fn wants_acquisition(&self, state: &PlayerGameState, map: &TrainMap) -> bool;

    /// The connection to go for: the lexicographically least currently
    /// acquirable connection (city pair, then color name, then length).
    fn pick_connection(&self, state: &PlayerGameState, map: &TrainMap) -> Option<Connection> {
        state.acquirable_connections(map).into_iter().next()
    }

    /// The full turn decision: an acquisition when this strategy wants one
    /// and one is available, a draw otherwise.
    fn pick_turn(&self, state: &PlayerGameState, map: &TrainMap) -> TurnAction {
        if self.wants_acquisition(state, map) {
            match self.pick_connection(state, map) {
                Some(connection) => TurnAction::AcquireConnection(connection),
                None => TurnAction::DrawCards,
            }
        } else {
            TurnAction::DrawCards
        }
    }
}

/// Acquires whenever any legal acquisition exists; keeps the
/// lexicographically greatest of the offered destinations.
pub struct BuyNow;

impl Strategy for BuyNow {
    fn choose_destinations(
        &self,
        offered: &BTreeSet<Destination>,
        count: usize,
    ) -> BTreeSet<Destination> {
        offered.iter().rev().take(count).cloned().collect()
    }

    fn wants_acquisition(&self, state: &PlayerGameState, map: &TrainMap) -> bool {
        !state.acquirable_connections(map).is_empty()
    }
}

/// Draws until it holds at least ten cards, and only then starts acquiring;
/// keeps the lexicographically least of the offered destinations.
pub struct Hold10;

impl Strategy for Hold10 {
    fn choose_destinations(
        &self,
        offered: &BTreeSet<Destination>,
        count: usize,
    ) -> BTreeSet<Destination> {
        offered.iter().take(count).cloned().collect()
    }

    fn wants_acquisition(&self, state: &PlayerGameState, map: &TrainMap) -> bool {
        state.total_cards() >= CARD_HOLD_THRESHOLD
            && !state.acquirable_connections(map).is_empty()
    }
}

/// A deliberately non-conformant strategy for fault-injection testing: every
/// turn proposes a connection that does not exist on the map.
pub struct Cheat;

impl Strategy for Cheat {
    fn choose_destinations(
        &self,
        offered: &BTreeSet<Destination>,
        count: usize,
    ) -> BTreeSet<Destination> {
        BuyNow.choose_destinations(offered, count)
    }

    fn wants_acquisition(&self, _state: &PlayerGameState, _map: &TrainMap) -> bool {
        true
    }

    fn pick_turn(&self, _state: &PlayerGameState, map: &TrainMap) -> TurnAction {
        let fabricated = match map.connections().into_iter().next() {
            // Same cities and color as a real connection, with a length the
            // map cannot contain alongside it.
            Some(connection) => Connection::new(
                connection.cities().clone(),
                connection.color(),
                connection.length().saturating_add(1),
            )
            .unwrap(),
            None => Connection::new(
                CityPair::new("Boston", "NYC").unwrap(),
                RailColor::Blue,
                3,
            )
            .unwrap(),
        };

        TurnAction::AcquireConnection(fabricated)
    }
}

/// A deliberately non-conformant strategy for fault-injection testing:
/// refuses to relinquish any offered destination, so its selection always has
/// the wrong size.
pub struct DestinationHoarder;

impl Strategy for DestinationHoarder {
    fn choose_destinations(
        &self,
        offered: &BTreeSet<Destination>,
        _count: usize,
    ) -> BTreeSet<Destination> {
        offered.clone()
    }

    fn wants_acquisition(&self, _state: &PlayerGameState, _map: &TrainMap) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardHand;
    use crate::map::MapDimensions;
    use pretty_assertions::assert_eq;

    fn connection(a: &str, b: &str, color: RailColor, length: u8) -> Connection {
        Connection::new(CityPair::new(a, b).unwrap(), color, length).unwrap()
    }

    fn destination(a: &str, b: &str) -> Destination {
        Destination(CityPair::new(a, b).unwrap())
    }

    fn small_map() -> TrainMap {
        TrainMap::new(
            MapDimensions {
                width: 200,
                height: 200,
            },
            ["Albany", "Boston", "NYC"].map(String::from).into_iter(),
            [
                connection("Albany", "Boston", RailColor::Green, 2),
                connection("Boston", "NYC", RailColor::Blue, 3),
                connection("Albany", "NYC", RailColor::Red, 2),
            ],
        )
        .unwrap()
    }

    fn state_with_hand(hand: CardHand, rails: u32) -> PlayerGameState {
        PlayerGameState::new(BTreeSet::new(), vec![], hand, rails, BTreeSet::new())
    }

    fn offered() -> BTreeSet<Destination> {
        BTreeSet::from([
            destination("Boston", "NYC"),
            destination("Boston", "Seattle"),
            destination("NYC", "Seattle"),
        ])
    }

    #[test]
    fn buy_now_keeps_greatest_destinations() {
        let chosen = BuyNow.choose_destinations(&offered(), 2);
        assert_eq!(
            chosen,
            BTreeSet::from([
                destination("Boston", "Seattle"),
                destination("NYC", "Seattle"),
            ])
        );
    }

    #[test]
    fn hold_10_keeps_least_destinations() {
        let chosen = Hold10.choose_destinations(&offered(), 2);
        assert_eq!(
            chosen,
            BTreeSet::from([
                destination("Boston", "NYC"),
                destination("Boston", "Seattle"),
            ])
        );
    }

    #[test]
    fn destination_choice_is_reproducible() {
        for _ in 0..5 {
            assert_eq!(
                BuyNow.choose_destinations(&offered(), 2),
                BuyNow.choose_destinations(&offered(), 2)
            );
            assert_eq!(
                Hold10.choose_destinations(&offered(), 2),
                Hold10.choose_destinations(&offered(), 2)
            );
        }
    }

    #[test]
    fn buy_now_acquires_whenever_possible() {
        let map = small_map();

        let can_afford = state_with_hand(CardHand::from_cards([RailColor::Blue; 3]), 45);
        assert_eq!(
            BuyNow.pick_turn(&can_afford, &map),
            TurnAction::AcquireConnection(connection("Boston", "NYC", RailColor::Blue, 3))
        );

        let cannot_afford = state_with_hand(CardHand::from_cards([RailColor::Blue; 2]), 45);
        assert_eq!(BuyNow.pick_turn(&cannot_afford, &map), TurnAction::DrawCards);
    }

    #[test]
    fn hold_10_draws_below_the_threshold() {
        let map = small_map();

        // Nine cards: draws even though an acquisition is affordable.
        let nine_cards = state_with_hand(
            CardHand::from_cards(
                [RailColor::Blue; 3]
                    .into_iter()
                    .chain([RailColor::White; 6]),
            ),
            45,
        );
        assert_eq!(nine_cards.total_cards(), 9);
        assert_eq!(Hold10.pick_turn(&nine_cards, &map), TurnAction::DrawCards);

        // Ten cards: acquires.
        let ten_cards = state_with_hand(
            CardHand::from_cards(
                [RailColor::Blue; 3]
                    .into_iter()
                    .chain([RailColor::White; 7]),
            ),
            45,
        );
        assert_eq!(
            Hold10.pick_turn(&ten_cards, &map),
            TurnAction::AcquireConnection(connection("Boston", "NYC", RailColor::Blue, 3))
        );

        // Ten cards but nothing affordable: still draws.
        let wrong_colors = state_with_hand(CardHand::from_cards([RailColor::White; 10]), 45);
        assert_eq!(Hold10.pick_turn(&wrong_colors, &map), TurnAction::DrawCards);
    }

    #[test]
    fn pick_connection_takes_the_least_acquirable() {
        let map = small_map();

        // All three connections affordable: Albany-Boston green sorts first.
        let rich = state_with_hand(
            CardHand::from_cards(
                [RailColor::Blue; 3]
                    .into_iter()
                    .chain([RailColor::Green; 2])
                    .chain([RailColor::Red; 2]),
            ),
            45,
        );
        assert_eq!(
            BuyNow.pick_connection(&rich, &map),
            Some(connection("Albany", "Boston", RailColor::Green, 2))
        );

        // Only the red Albany-NYC connection affordable.
        let red_only = state_with_hand(CardHand::from_cards([RailColor::Red; 2]), 45);
        assert_eq!(
            BuyNow.pick_connection(&red_only, &map),
            Some(connection("Albany", "NYC", RailColor::Red, 2))
        );

        let broke = state_with_hand(CardHand::new(), 45);
        assert_eq!(BuyNow.pick_connection(&broke, &map), None);
    }

    #[test]
    fn cheat_always_proposes_an_off_map_connection() {
        let map = small_map();
        let state = state_with_hand(CardHand::new(), 45);

        match Cheat.pick_turn(&state, &map) {
            TurnAction::AcquireConnection(connection) => assert!(!map.contains(&connection)),
            TurnAction::DrawCards => panic!("Cheat never draws"),
        }
    }

    #[test]
    fn destination_hoarder_keeps_everything() {
        assert_eq!(
            DestinationHoarder.choose_destinations(&offered(), 2),
            offered()
        );
    }
}
