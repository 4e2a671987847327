use crate::card::{CardHand, Deck, DrawnCards};
use crate::map::{Connection, Destination, TrainMap};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The authoritative record of who owns which connection.
///
/// Every connection of the map is tracked, as either unowned or owned by a
/// seat index. Ownership is monotone and exclusive: once assigned, an owner
/// is never reassigned or cleared, even when the owning player is later
/// eliminated.
#[derive(Clone, Debug, PartialEq)]
pub struct Ledger {
    owners: BTreeMap<Connection, Option<usize>>,
}

impl Ledger {
    /// A ledger over the given map, with every connection unowned.
    pub fn new(map: &TrainMap) -> Self {
        Self {
            owners: map
                .connections()
                .into_iter()
                .map(|connection| (connection, None))
                .collect(),
        }
    }

    /// The owner of the given connection, if it is on the map and owned.
    pub fn owner(&self, connection: &Connection) -> Option<usize> {
        self.owners.get(connection).copied().flatten()
    }

    /// Whether the connection is on the map and not yet owned.
    pub fn is_unoccupied(&self, connection: &Connection) -> bool {
        matches!(self.owners.get(connection), Some(None))
    }

    /// Marks the connection as owned by `seat`.
    ///
    /// Fails without mutating the ledger if the connection is not on the map
    /// or already has an owner.
    pub fn assign(&mut self, connection: &Connection, seat: usize) -> Result<(), String> {
        match self.owners.get_mut(connection) {
            None => Err(format!(
                "No connection between {} and {} exists on the map.",
                connection.cities().first(),
                connection.cities().second()
            )),
            Some(Some(owner)) => Err(format!(
                "The connection between {} and {} is already owned by seat {}.",
                connection.cities().first(),
                connection.cities().second(),
                owner
            )),
            Some(owner @ None) => {
                *owner = Some(seat);
                Ok(())
            }
        }
    }

    /// A copy of every connection with no owner.
    pub fn unoccupied(&self) -> BTreeSet<Connection> {
        self.owners
            .iter()
            .filter(|(_, owner)| owner.is_none())
            .map(|(connection, _)| connection.clone())
            .collect()
    }

    /// A copy of every connection owned by the given seat.
    pub fn owned_by(&self, seat: usize) -> BTreeSet<Connection> {
        self.owners
            .iter()
            .filter(|(_, owner)| **owner == Some(seat))
            .map(|(connection, _)| connection.clone())
            .collect()
    }
}

/// One player's private holdings: their hand, remaining rails, and chosen
/// destinations (empty until destination selection completes).
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerInventory {
    pub hand: CardHand,
    pub rails: u32,
    pub destinations: BTreeSet<Destination>,
}

impl PlayerInventory {
    pub fn new(hand: CardHand, rails: u32, destinations: BTreeSet<Destination>) -> Self {
        Self {
            hand,
            rails,
            destinations,
        }
    }
}

/// The slice of the game one player is allowed to see: their own holdings and
/// connections, plus only the owned connections of every other seat.
///
/// A snapshot is copy-isolated from the live game state. It is rebuilt after
/// every turn, never mutated, and can therefore be handed to untrusted
/// decision logic without any further protection.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerGameState {
    owned: BTreeSet<Connection>,
    opponents_owned: Vec<BTreeSet<Connection>>,
    hand: CardHand,
    rails: u32,
    destinations: BTreeSet<Destination>,
}

impl PlayerGameState {
    pub fn new(
        owned: BTreeSet<Connection>,
        opponents_owned: Vec<BTreeSet<Connection>>,
        hand: CardHand,
        rails: u32,
        destinations: BTreeSet<Destination>,
    ) -> Self {
        Self {
            owned,
            opponents_owned,
            hand,
            rails,
            destinations,
        }
    }

    /// A copy of the connections this player owns.
    pub fn owned_connections(&self) -> BTreeSet<Connection> {
        self.owned.clone()
    }

    /// A copy of each opponent's owned connections, in seat order, the acting
    /// player excluded. This is all a player ever learns about its opponents.
    pub fn opponents_owned_connections(&self) -> Vec<BTreeSet<Connection>> {
        self.opponents_owned.clone()
    }

    /// A copy of this player's hand.
    pub fn hand(&self) -> CardHand {
        self.hand.clone()
    }

    pub fn rails(&self) -> u32 {
        self.rails
    }

    /// A copy of this player's chosen destinations.
    pub fn destinations(&self) -> BTreeSet<Destination> {
        self.destinations.clone()
    }

    /// The total number of cards in this player's hand.
    pub fn total_cards(&self) -> u32 {
        self.hand.total()
    }

    /// Every map connection owned by nobody, from this player's view.
    pub fn unoccupied_connections(&self, map: &TrainMap) -> BTreeSet<Connection> {
        let mut unoccupied = map.connections();

        for connection in &self.owned {
            unoccupied.remove(connection);
        }
        for opponent_owned in &self.opponents_owned {
            for connection in opponent_owned {
                unoccupied.remove(connection);
            }
        }

        unoccupied
    }

    /// The unoccupied connections this player can currently afford: enough
    /// cards of the connection's color and enough rails for its length.
    ///
    /// Returns the empty set when none qualify.
    pub fn acquirable_connections(&self, map: &TrainMap) -> BTreeSet<Connection> {
        self.unoccupied_connections(map)
            .into_iter()
            .filter(|connection| self.can_afford(connection))
            .collect()
    }

    /// Whether acquiring the given connection is legal for this player:
    /// the connection exists on the map, nobody owns it, and the player can
    /// afford it.
    pub fn is_legal_acquisition(&self, map: &TrainMap, connection: &Connection) -> bool {
        map.contains(connection)
            && self.unoccupied_connections(map).contains(connection)
            && self.can_afford(connection)
    }

    fn can_afford(&self, connection: &Connection) -> bool {
        let length = u32::from(connection.length());
        self.hand.count(connection.color()) >= length && self.rails >= length
    }
}

/// The referee's mutable game state: the map, the ownership ledger, the draw
/// pile, and one inventory per seat.
///
/// Only the referee mutates this, one validated action at a time. Players
/// only ever see [`PlayerGameState`] snapshots built by [`Self::snapshot_for`].
#[derive(Debug)]
pub struct RefereeGameState {
    map: Arc<TrainMap>,
    ledger: Ledger,
    deck: Deck,
    inventories: Vec<PlayerInventory>,
}

impl RefereeGameState {
    /// Builds the state for a fresh game: all connections unowned, the given
    /// deck as the shared draw pile, and one inventory per seat in turn order.
    pub fn new(map: Arc<TrainMap>, deck: Deck, inventories: Vec<PlayerInventory>) -> Self {
        Self {
            ledger: Ledger::new(&map),
            map,
            deck,
            inventories,
        }
    }

    pub fn map(&self) -> &Arc<TrainMap> {
        &self.map
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// How many cards remain in the shared draw pile.
    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    pub fn rails_of(&self, seat: usize) -> u32 {
        self.inventories[seat].rails
    }

    /// A copy of the given seat's hand.
    pub fn hand_of(&self, seat: usize) -> CardHand {
        self.inventories[seat].hand.clone()
    }

    /// A copy of the given seat's chosen destinations.
    pub fn destinations_of(&self, seat: usize) -> BTreeSet<Destination> {
        self.inventories[seat].destinations.clone()
    }

    /// Builds the read-only snapshot for the given seat.
    ///
    /// Opponent entries cover every other seat, eliminated ones included:
    /// an eliminated player's connections stay owned, so they must remain
    /// visible as occupied.
    pub fn snapshot_for(&self, seat: usize) -> PlayerGameState {
        let inventory = &self.inventories[seat];
        let opponents_owned = (0..self.inventories.len())
            .filter(|other| *other != seat)
            .map(|other| self.ledger.owned_by(other))
            .collect();

        PlayerGameState::new(
            self.ledger.owned_by(seat),
            opponents_owned,
            inventory.hand.clone(),
            inventory.rails,
            inventory.destinations.clone(),
        )
    }

    /// Draws up to `count` cards from the shared pile into the seat's hand,
    /// returning a copy of the drawn cards in draw order.
    ///
    /// An exhausted pile yields a short (possibly empty) draw; the cards are
    /// gone from the pile either way.
    pub fn draw_cards_for(&mut self, seat: usize, count: usize) -> DrawnCards {
        let drawn = self.deck.draw_up_to(count);
        for card in &drawn {
            self.inventories[seat].hand.add(*card, 1);
        }

        drawn
    }

    /// Attempts to acquire the connection for the seat.
    ///
    /// On success the connection is marked owned, and the seat pays
    /// length-many cards of the connection's color plus length-many rails.
    /// On failure nothing changes and `false` is returned.
    pub fn acquire_connection_for(&mut self, seat: usize, connection: &Connection) -> bool {
        if !self
            .snapshot_for(seat)
            .is_legal_acquisition(&self.map, connection)
        {
            return false;
        }

        // Legality was just checked, so each step below must succeed.
        let length = u32::from(connection.length());
        self.ledger.assign(connection, seat).unwrap();
        let inventory = &mut self.inventories[seat];
        inventory.hand.remove(connection.color(), length).unwrap();
        inventory.rails -= length;

        true
    }

    /// The number of seats this game was set up with, eliminated ones
    /// included.
    pub fn num_seats(&self) -> usize {
        self.inventories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::RailColor;
    use crate::map::{CityPair, MapDimensions};
    use pretty_assertions::assert_eq;

    fn connection(a: &str, b: &str, color: RailColor, length: u8) -> Connection {
        Connection::new(CityPair::new(a, b).unwrap(), color, length).unwrap()
    }

    fn small_map() -> TrainMap {
        TrainMap::new(
            MapDimensions {
                width: 200,
                height: 200,
            },
            ["Boston", "NYC", "Seattle"].map(String::from).into_iter(),
            [
                connection("Boston", "NYC", RailColor::Blue, 3),
                connection("NYC", "Seattle", RailColor::Red, 5),
                connection("Boston", "Seattle", RailColor::White, 2),
            ],
        )
        .unwrap()
    }

    fn single_connection_map() -> TrainMap {
        TrainMap::new(
            MapDimensions {
                width: 200,
                height: 200,
            },
            ["Boston", "NYC"].map(String::from).into_iter(),
            [connection("Boston", "NYC", RailColor::Blue, 3)],
        )
        .unwrap()
    }

    fn state_with_hands(map: TrainMap, hands: Vec<(CardHand, u32)>) -> RefereeGameState {
        let inventories = hands
            .into_iter()
            .map(|(hand, rails)| PlayerInventory::new(hand, rails, BTreeSet::new()))
            .collect();
        RefereeGameState::new(Arc::new(map), Deck::new(vec![]), inventories)
    }

    #[test]
    fn ledger_starts_unowned_and_partitions() {
        let map = small_map();
        let ledger = Ledger::new(&map);

        assert_eq!(ledger.unoccupied(), map.connections());
        assert!(ledger.owned_by(0).is_empty());
    }

    #[test]
    fn ledger_assignment_is_monotone_and_exclusive() {
        let map = small_map();
        let mut ledger = Ledger::new(&map);
        let target = connection("Boston", "NYC", RailColor::Blue, 3);

        assert!(ledger.assign(&target, 1).is_ok());
        assert_eq!(ledger.owner(&target), Some(1));

        // Nobody can claim it again, not even the owner.
        assert!(ledger.assign(&target, 0).is_err());
        assert!(ledger.assign(&target, 1).is_err());
        assert_eq!(ledger.owner(&target), Some(1));

        // Off-map connections are rejected.
        let off_map = connection("Boston", "NYC", RailColor::Red, 3);
        assert!(ledger.assign(&off_map, 0).is_err());
    }

    #[test]
    fn ledger_partition_holds_after_assignments() {
        let map = small_map();
        let mut ledger = Ledger::new(&map);

        ledger
            .assign(&connection("Boston", "NYC", RailColor::Blue, 3), 0)
            .unwrap();
        ledger
            .assign(&connection("NYC", "Seattle", RailColor::Red, 5), 1)
            .unwrap();

        let mut union = ledger.unoccupied();
        union.extend(ledger.owned_by(0));
        union.extend(ledger.owned_by(1));
        assert_eq!(union, map.connections());
        assert_eq!(
            ledger.unoccupied().len() + ledger.owned_by(0).len() + ledger.owned_by(1).len(),
            map.connections().len()
        );
    }

    #[test]
    fn snapshot_hides_opponent_holdings() {
        let map = small_map();
        let mut state = state_with_hands(
            map,
            vec![
                (CardHand::from_cards([RailColor::Blue; 3]), 10),
                (CardHand::from_cards([RailColor::Red; 5]), 10),
            ],
        );

        assert!(state.acquire_connection_for(1, &connection("NYC", "Seattle", RailColor::Red, 5)));

        let snapshot = state.snapshot_for(0);
        assert!(snapshot.owned_connections().is_empty());
        assert_eq!(
            snapshot.opponents_owned_connections(),
            vec![BTreeSet::from([connection(
                "NYC",
                "Seattle",
                RailColor::Red,
                5
            )])]
        );
        assert_eq!(snapshot.hand().count(RailColor::Blue), 3);
    }

    #[test]
    fn snapshot_is_isolated_from_live_state() {
        let map = single_connection_map();
        let mut state = state_with_hands(
            map,
            vec![(CardHand::from_cards([RailColor::Blue; 3]), 3)],
        );

        let before = state.snapshot_for(0);
        assert!(state.acquire_connection_for(0, &connection("Boston", "NYC", RailColor::Blue, 3)));

        // The old snapshot still reflects the pre-acquisition world.
        assert!(before.owned_connections().is_empty());
        assert_eq!(before.hand().count(RailColor::Blue), 3);

        let after = state.snapshot_for(0);
        assert_eq!(after.owned_connections().len(), 1);
        assert_eq!(after.hand().count(RailColor::Blue), 0);
    }

    #[test]
    fn unoccupied_connections_excludes_everyone_owned() {
        let map = small_map();
        let mut state = state_with_hands(
            map.clone(),
            vec![
                (CardHand::from_cards([RailColor::Blue; 3]), 10),
                (CardHand::from_cards([RailColor::Red; 5]), 10),
            ],
        );

        assert!(state.acquire_connection_for(0, &connection("Boston", "NYC", RailColor::Blue, 3)));
        assert!(state.acquire_connection_for(1, &connection("NYC", "Seattle", RailColor::Red, 5)));

        let snapshot = state.snapshot_for(0);
        assert_eq!(
            snapshot.unoccupied_connections(&map),
            BTreeSet::from([connection("Boston", "Seattle", RailColor::White, 2)])
        );
    }

    #[test]
    fn acquirable_requires_cards_and_rails() {
        let map = small_map();

        // Enough blue cards, plenty of rails.
        let state = state_with_hands(
            map.clone(),
            vec![(CardHand::from_cards([RailColor::Blue; 3]), 10)],
        );
        assert_eq!(
            state.snapshot_for(0).acquirable_connections(&map),
            BTreeSet::from([connection("Boston", "NYC", RailColor::Blue, 3)])
        );

        // Enough cards of the wrong color.
        let state = state_with_hands(
            map.clone(),
            vec![(CardHand::from_cards([RailColor::Green; 5]), 10)],
        );
        assert!(state.snapshot_for(0).acquirable_connections(&map).is_empty());

        // Enough cards, not enough rails.
        let state = state_with_hands(
            map.clone(),
            vec![(CardHand::from_cards([RailColor::Blue; 3]), 2)],
        );
        assert!(state.snapshot_for(0).acquirable_connections(&map).is_empty());
    }

    #[test]
    fn acquirable_connections_are_all_legal() {
        let map = small_map();
        let state = state_with_hands(
            map.clone(),
            vec![(
                CardHand::from_cards(
                    [RailColor::Blue; 3]
                        .into_iter()
                        .chain([RailColor::White; 2]),
                ),
                4,
            )],
        );

        let snapshot = state.snapshot_for(0);
        let acquirable = snapshot.acquirable_connections(&map);

        // Rails (4) cover the white 2 and blue 3 individually.
        assert_eq!(acquirable.len(), 2);
        for connection in &acquirable {
            assert!(snapshot.is_legal_acquisition(&map, connection));
        }
    }

    #[test]
    fn single_connection_scenario() {
        let map = single_connection_map();
        let target = connection("Boston", "NYC", RailColor::Blue, 3);
        let mut state = state_with_hands(
            map.clone(),
            vec![(CardHand::from_cards([RailColor::Blue; 3]), 3)],
        );

        assert_eq!(
            state.snapshot_for(0).acquirable_connections(&map),
            BTreeSet::from([target.clone()])
        );

        assert!(state.acquire_connection_for(0, &target));
        assert_eq!(state.ledger().owner(&target), Some(0));
        assert_eq!(state.hand_of(0).count(RailColor::Blue), 0);
        assert_eq!(state.rails_of(0), 0);

        // Second attempt on the same connection fails and changes nothing.
        assert!(!state.acquire_connection_for(0, &target));
        assert_eq!(state.ledger().owner(&target), Some(0));
        assert_eq!(state.rails_of(0), 0);
    }

    #[test]
    fn failed_acquisition_leaves_state_untouched() {
        let map = single_connection_map();
        let mut state = state_with_hands(
            map,
            vec![(CardHand::from_cards([RailColor::Blue; 2]), 10)],
        );

        let target = connection("Boston", "NYC", RailColor::Blue, 3);
        assert!(!state.acquire_connection_for(0, &target));
        assert!(state.ledger().is_unoccupied(&target));
        assert_eq!(state.hand_of(0).count(RailColor::Blue), 2);
        assert_eq!(state.rails_of(0), 10);
    }

    #[test]
    fn draw_adds_to_hand_and_depletes_deck() {
        let map = single_connection_map();
        let mut state = RefereeGameState::new(
            Arc::new(map),
            Deck::new(vec![RailColor::Red, RailColor::Blue]),
            vec![PlayerInventory::new(CardHand::new(), 45, BTreeSet::new())],
        );

        let drawn = state.draw_cards_for(0, 4);
        assert_eq!(drawn.as_slice(), &[RailColor::Red, RailColor::Blue]);
        assert_eq!(state.hand_of(0).total(), 2);
        assert_eq!(state.deck_len(), 0);

        assert!(state.draw_cards_for(0, 4).is_empty());
        assert_eq!(state.hand_of(0).total(), 2);
    }
}
