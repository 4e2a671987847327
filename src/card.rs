use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, VecDeque};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter};

/// The fixed color palette shared by rail cards and connections.
///
/// Declaration order matches the lexicographic order of the color names, so
/// the derived `Ord` is the name order that tie-breaking rules rely on.
///
/// # JSON
/// Colors are serialized as their lowercase name.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumCountMacro,
    EnumIter,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RailColor {
    Blue,
    Green,
    Red,
    White,
}

/// Cards handed out by a single draw request.
/// Draws are small (two cards by default), so they stay on the stack.
pub type DrawnCards = SmallVec<[RailColor; 2]>;

/// A player's hand of rail cards: every palette color mapped to a
/// non-negative count, colors with no cards included with a count of zero.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CardHand {
    counts: BTreeMap<RailColor, u32>,
}

impl CardHand {
    /// An empty hand, with every color present at count zero.
    pub fn new() -> Self {
        Self {
            counts: RailColor::iter().map(|color| (color, 0)).collect(),
        }
    }

    /// Builds a hand by counting the given cards.
    ///
    /// # Example
    /// ```
    /// use trains_engine::card::{CardHand, RailColor};
    ///
    /// let hand = CardHand::from_cards([RailColor::Blue, RailColor::Blue, RailColor::Red]);
    /// assert_eq!(hand.count(RailColor::Blue), 2);
    /// assert_eq!(hand.count(RailColor::White), 0);
    /// assert_eq!(hand.total(), 3);
    /// ```
    pub fn from_cards(cards: impl IntoIterator<Item = RailColor>) -> Self {
        let mut hand = Self::new();
        for card in cards {
            hand.add(card, 1);
        }
        hand
    }

    /// The number of cards of the given color in this hand.
    pub fn count(&self, color: RailColor) -> u32 {
        self.counts[&color]
    }

    /// The total number of cards in this hand, across all colors.
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Adds `amount` cards of the given color to the hand.
    pub fn add(&mut self, color: RailColor, amount: u32) {
        *self.counts.get_mut(&color).unwrap() += amount;
    }

    /// Removes `amount` cards of the given color from the hand.
    ///
    /// Fails without mutating the hand if fewer than `amount` cards of that
    /// color are held.
    pub fn remove(&mut self, color: RailColor, amount: u32) -> Result<(), String> {
        let held = self.counts.get_mut(&color).unwrap();
        if *held < amount {
            return Err(format!(
                "Cannot remove {} {} cards from a hand holding {}.",
                amount, color, held
            ));
        }

        *held -= amount;
        Ok(())
    }

    /// A copy of the per-color counts.
    pub fn counts(&self) -> BTreeMap<RailColor, u32> {
        self.counts.clone()
    }
}

impl Default for CardHand {
    fn default() -> Self {
        Self::new()
    }
}

/// The shared draw pile: depletable, never replenished mid-game.
#[derive(Debug)]
pub struct Deck {
    cards: VecDeque<RailColor>,
}

impl Deck {
    /// Builds a deck dealing the given cards front to back.
    pub fn new(cards: Vec<RailColor>) -> Self {
        Self {
            cards: VecDeque::from(cards),
        }
    }

    /// A deck of `size` uniformly random cards.
    pub fn random(size: usize) -> Self {
        let palette: Vec<RailColor> = RailColor::iter().collect();
        let mut rng = thread_rng();

        Self::new(
            (0..size)
                .map(|_| *palette.choose(&mut rng).unwrap())
                .collect(),
        )
    }

    /// How many cards remain in the deck.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Removes and returns up to `count` cards from the front of the deck.
    ///
    /// When the deck holds fewer than `count` cards, all remaining cards are
    /// returned; an exhausted deck yields an empty draw, which is not an
    /// error.
    ///
    /// # Example
    /// ```
    /// use trains_engine::card::{Deck, RailColor};
    ///
    /// let mut deck = Deck::new(vec![RailColor::Red, RailColor::Blue]);
    /// assert_eq!(deck.draw_up_to(4).len(), 2);
    /// assert!(deck.draw_up_to(4).is_empty());
    /// ```
    pub fn draw_up_to(&mut self, count: usize) -> DrawnCards {
        let available = count.min(self.cards.len());
        self.cards.drain(..available).collect()
    }

    /// Copies up to `count` cards from the front without removing them.
    ///
    /// Lets the referee offer a starting hand and commit the deal with
    /// [`Self::draw_up_to`] only once the player has cooperated; a hand
    /// offered to an unresponsive player stays in the deck.
    pub fn peek_up_to(&self, count: usize) -> DrawnCards {
        self.cards.iter().take(count).copied().collect()
    }
}
