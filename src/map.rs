use crate::card::RailColor;
use crate::error::EngineError;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Smallest board dimension accepted by [`TrainMap::new`].
pub const MIN_DIMENSION: u32 = 10;
/// Largest board dimension accepted by [`TrainMap::new`].
pub const MAX_DIMENSION: u32 = 800;

/// An unordered pair of two distinct city names.
///
/// The pair is normalized on construction: the lexicographically smaller name
/// is always stored first, so two pairs naming the same cities in either
/// order compare equal, and the derived `Ord` is the lexicographic order that
/// tie-breaking rules rely on.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "RawCityPair")]
pub struct CityPair {
    first: String,
    second: String,
}

#[derive(Deserialize)]
struct RawCityPair {
    first: String,
    second: String,
}

impl TryFrom<RawCityPair> for CityPair {
    type Error = EngineError;

    fn try_from(raw: RawCityPair) -> Result<Self, Self::Error> {
        Self::new(raw.first, raw.second)
    }
}

impl CityPair {
    /// Builds a normalized pair out of two distinct city names.
    ///
    /// # Example
    /// ```
    /// use trains_engine::map::CityPair;
    ///
    /// let pair = CityPair::new("NYC", "Boston").unwrap();
    /// assert_eq!(pair, CityPair::new("Boston", "NYC").unwrap());
    /// assert_eq!(pair.first(), "Boston");
    ///
    /// assert!(CityPair::new("Boston", "Boston").is_err());
    /// ```
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Result<Self, EngineError> {
        let a = a.into();
        let b = b.into();

        if a == b {
            return Err(EngineError::IdenticalCities(a));
        }

        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { first, second })
    }

    /// The lexicographically smaller of the two city names.
    pub fn first(&self) -> &str {
        &self.first
    }

    /// The lexicographically larger of the two city names.
    pub fn second(&self) -> &str {
        &self.second
    }
}

/// An edge of the rail network: two cities joined by a colored track of a
/// given length.
///
/// The derived `Ord` compares by city pair, then color name, then length,
/// which is the total order every deterministic tie-break in the engine uses.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "RawConnection")]
pub struct Connection {
    cities: CityPair,
    color: RailColor,
    length: u8,
}

#[derive(Deserialize)]
struct RawConnection {
    cities: CityPair,
    color: RailColor,
    length: u8,
}

impl TryFrom<RawConnection> for Connection {
    type Error = EngineError;

    fn try_from(raw: RawConnection) -> Result<Self, Self::Error> {
        Self::new(raw.cities, raw.color, raw.length)
    }
}

impl Connection {
    /// Builds a connection; the length must be positive.
    pub fn new(cities: CityPair, color: RailColor, length: u8) -> Result<Self, EngineError> {
        if length == 0 {
            return Err(EngineError::ZeroLengthConnection);
        }

        Ok(Self {
            cities,
            color,
            length,
        })
    }

    pub fn cities(&self) -> &CityPair {
        &self.cities
    }

    pub fn color(&self) -> RailColor {
        self.color
    }

    pub fn length(&self) -> u8 {
        self.length
    }
}

/// A pair of cities a player commits to connecting, scored at game end.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Destination(pub CityPair);

/// The width and height of the game board, both within
/// [[`MIN_DIMENSION`], [`MAX_DIMENSION`]].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MapDimensions {
    pub width: u32,
    pub height: u32,
}

/// The read-only rail network a game is played on: a finite set of cities,
/// the connections between them, and the board dimensions.
///
/// A map never changes for the lifetime of a game; ownership of connections
/// lives in the referee's ledger, not here.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainMap {
    dimensions: MapDimensions,
    cities: BTreeSet<String>,
    connections: BTreeSet<Connection>,
}

impl TrainMap {
    /// Builds a map, validating that the dimensions are in range and that
    /// every connection endpoint names a known city.
    pub fn new(
        dimensions: MapDimensions,
        cities: impl IntoIterator<Item = String>,
        connections: impl IntoIterator<Item = Connection>,
    ) -> Result<Self, EngineError> {
        for dimension in [dimensions.width, dimensions.height] {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&dimension) {
                return Err(EngineError::DimensionOutOfRange {
                    min: MIN_DIMENSION,
                    max: MAX_DIMENSION,
                    actual: dimension,
                });
            }
        }

        let cities: BTreeSet<String> = cities.into_iter().collect();
        let connections: BTreeSet<Connection> = connections.into_iter().collect();

        for connection in &connections {
            for endpoint in [connection.cities().first(), connection.cities().second()] {
                if !cities.contains(endpoint) {
                    return Err(EngineError::UnknownCity(endpoint.to_string()));
                }
            }
        }

        Ok(Self {
            dimensions,
            cities,
            connections,
        })
    }

    pub fn dimensions(&self) -> MapDimensions {
        self.dimensions
    }

    /// A copy of the city names on this map.
    pub fn cities(&self) -> BTreeSet<String> {
        self.cities.clone()
    }

    /// A copy of every connection on this map.
    pub fn connections(&self) -> BTreeSet<Connection> {
        self.connections.clone()
    }

    /// Whether the exact connection (city pair, color, and length) exists on
    /// this map.
    pub fn contains(&self, connection: &Connection) -> bool {
        self.connections.contains(connection)
    }

    /// Every city pair joined by some path of connections, i.e. every pair
    /// that could be handed out as a destination.
    pub fn all_destinations(&self) -> BTreeSet<Destination> {
        let mut destinations = BTreeSet::new();

        for component in self.connected_components() {
            let members: Vec<&String> = component.iter().collect();
            for (index, start) in members.iter().enumerate() {
                for end in &members[index + 1..] {
                    let pair = CityPair::new(start.as_str(), end.as_str()).unwrap();
                    destinations.insert(Destination(pair));
                }
            }
        }

        destinations
    }

    fn connected_components(&self) -> Vec<BTreeSet<String>> {
        let mut neighbors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for connection in &self.connections {
            let (first, second) = (connection.cities().first(), connection.cities().second());
            neighbors.entry(first).or_default().push(second);
            neighbors.entry(second).or_default().push(first);
        }

        let mut components = Vec::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();

        for city in &self.cities {
            if visited.contains(city.as_str()) {
                continue;
            }

            let mut component = BTreeSet::new();
            let mut to_visit = VecDeque::from([city.as_str()]);
            visited.insert(city.as_str());

            while let Some(current) = to_visit.pop_front() {
                component.insert(current.to_string());

                for neighbor in neighbors.get(current).into_iter().flatten() {
                    if visited.insert(neighbor) {
                        to_visit.push_back(neighbor);
                    }
                }
            }

            components.push(component);
        }

        components
    }
}
