//! Referee engine for Trains, a turn-based rail-network acquisition game.
//!
//! The [`referee::Referee`] runs a complete game between untrusted
//! [`player::Player`] implementations: it deals cards, offers destinations,
//! loops through turns, eliminates misbehaving players, and scores whoever
//! survives. Stock decision policies live in [`strategy`].

pub mod action;
pub mod card;
pub mod error;
pub mod harness;
pub mod map;
pub mod player;
pub mod referee;
pub mod score;
pub mod state;
pub mod strategy;
