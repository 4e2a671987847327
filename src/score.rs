use crate::map::{Connection, Destination};

use lazy_static::lazy_static;
use std::cmp::max;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{mpsc, Arc, Mutex};
use threadpool::ThreadPool;

lazy_static! {
    static ref THREAD_POOL: Mutex<ThreadPool> = Mutex::new(ThreadPool::default());
}

const POINTS_PER_SEGMENT: i32 = 1;
const POINTS_PER_DESTINATION: i32 = 10;
const POINTS_PER_FAILED_DESTINATION: i32 = -10;
const POINTS_FOR_LONGEST_PATH: i32 = 20;

/// What end-game scoring gets to see about one player: their owned
/// connections and chosen destinations, in seat order.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoringData {
    pub owned: BTreeSet<Connection>,
    pub destinations: BTreeSet<Destination>,
}

/// End-game scoring, injectable so rule variants can swap the formula
/// without touching the orchestration.
pub trait Scorer {
    /// One score per player, in the same order as the input.
    fn score(&self, players: &[ScoringData]) -> Vec<i32>;
}

/// The standard schedule: one point per owned segment, ten per completed
/// destination, minus ten per uncompleted destination, and twenty to every
/// player tying for the longest continuous path.
///
/// When nobody owns a connection, every player ties for a longest path of
/// zero and all of them receive the bonus.
pub struct StandardScorer;

impl Scorer for StandardScorer {
    fn score(&self, players: &[ScoringData]) -> Vec<i32> {
        let longest_paths: Vec<u32> = players
            .iter()
            .map(|player| longest_continuous_path(&player.owned))
            .collect();
        let overall_longest = longest_paths.iter().copied().max().unwrap_or(0);

        players
            .iter()
            .zip(&longest_paths)
            .map(|(player, longest)| {
                let segments: i32 = player
                    .owned
                    .iter()
                    .map(|connection| i32::from(connection.length()))
                    .sum();

                let destinations: i32 = player
                    .destinations
                    .iter()
                    .map(|destination| {
                        if destination_completed(&player.owned, destination) {
                            POINTS_PER_DESTINATION
                        } else {
                            POINTS_PER_FAILED_DESTINATION
                        }
                    })
                    .sum();

                let longest_bonus = if *longest == overall_longest {
                    POINTS_FOR_LONGEST_PATH
                } else {
                    0
                };

                segments * POINTS_PER_SEGMENT + destinations + longest_bonus
            })
            .collect()
    }
}

/// Whether the owned connections join the destination's two cities.
pub fn destination_completed(owned: &BTreeSet<Connection>, destination: &Destination) -> bool {
    let start = destination.0.first();
    let goal = destination.0.second();

    let mut visited = BTreeSet::from([start]);
    let mut to_visit = VecDeque::from([start]);

    while let Some(city) = to_visit.pop_front() {
        if city == goal {
            return true;
        }

        for connection in owned {
            let pair = connection.cities();
            let neighbor = if pair.first() == city {
                pair.second()
            } else if pair.second() == city {
                pair.first()
            } else {
                continue;
            };

            if visited.insert(neighbor) {
                to_visit.push_back(neighbor);
            }
        }
    }

    false
}

/// The length of the longest continuous path through the owned connections.
///
/// A path may revisit a city but never reuses a connection. Each candidate
/// start city is explored on a separate thread from the shared pool.
pub fn longest_continuous_path(owned: &BTreeSet<Connection>) -> u32 {
    if owned.is_empty() {
        return 0;
    }

    // City -> (edge id, neighboring city, edge length). Edge ids mark
    // connections as used along a path.
    let mut adjacency: HashMap<String, Vec<(usize, String, u8)>> = HashMap::new();
    for (edge, connection) in owned.iter().enumerate() {
        let first = connection.cities().first().to_string();
        let second = connection.cities().second().to_string();
        let length = connection.length();

        adjacency
            .entry(first.clone())
            .or_default()
            .push((edge, second.clone(), length));
        adjacency
            .entry(second)
            .or_default()
            .push((edge, first, length));
    }

    let start_cities: Vec<String> = adjacency.keys().cloned().collect();
    let num_edges = owned.len();
    let adjacency = Arc::new(adjacency);
    let (tx, rx) = mpsc::sync_channel(0);
    let thread_pool = THREAD_POOL.lock().unwrap();

    for city in &start_cities {
        let adjacency = adjacency.clone();
        let city = city.clone();
        let tx = tx.clone();

        thread_pool.execute(move || {
            let mut used = vec![false; num_edges];
            tx.send(longest_path_from(&city, &adjacency, &mut used, 0))
                .unwrap();
        });
    }

    let mut longest = 0;
    for _ in 0..start_cities.len() {
        longest = max(longest, rx.recv().unwrap());
    }

    longest
}

fn longest_path_from(
    city: &str,
    adjacency: &HashMap<String, Vec<(usize, String, u8)>>,
    used: &mut Vec<bool>,
    current_length: u32,
) -> u32 {
    let mut longest = current_length;

    if let Some(neighbors) = adjacency.get(city) {
        for (edge, neighbor, length) in neighbors {
            if used[*edge] {
                continue;
            }

            used[*edge] = true;
            longest = max(
                longest,
                longest_path_from(
                    neighbor,
                    adjacency,
                    used,
                    current_length + u32::from(*length),
                ),
            );
            used[*edge] = false;
        }
    }

    longest
}
