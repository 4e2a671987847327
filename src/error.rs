use thiserror::Error;

/// Failures that prevent a game from being constructed or started.
///
/// Rule violations committed by players during a game are never surfaced
/// through this type: those are handled locally by the referee (elimination,
/// or an invalid turn classification), and the game continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("a city pair must name two distinct cities, got `{0}` twice")]
    IdenticalCities(String),
    #[error("connection endpoint `{0}` is not a city on the map")]
    UnknownCity(String),
    #[error("a connection must have a positive length")]
    ZeroLengthConnection,
    #[error("map dimensions must be within [{min}, {max}], got {actual}")]
    DimensionOutOfRange { min: u32, max: u32, actual: u32 },
    #[error("a game needs between {min} and {max} players, got {actual}")]
    BadPlayerCount {
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("player names must be unique, `{0}` appears more than once")]
    DuplicatePlayerName(String),
    #[error("not enough destinations: the map offers {available}, the game needs {needed}")]
    NotEnoughDestinations { available: usize, needed: usize },
}
