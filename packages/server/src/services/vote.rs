//! Plurality counting for both the werewolf night vote and the day vote.
//!
//! Ballots map voter id to target id. Everything here is pure; the only
//! randomness (night tie-break) comes from the caller's rng.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

pub type Ballots = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub winner: Option<String>,
    /// Targets sharing the maximum count when there is more than one, sorted by id.
    pub tied: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    Exile(String),
    /// First tie of the day: revote among these.
    Runoff(Vec<String>),
    /// Tied again inside a runoff: nobody leaves.
    Deadlock(Vec<String>),
    NoVotes,
}

pub fn tally(ballots: &Ballots) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for target in ballots.values() {
        *counts.entry(target.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn resolve(ballots: &Ballots) -> Resolution {
    let counts = tally(ballots);
    let max = match counts.values().max() {
        Some(max) => *max,
        None => {
            return Resolution {
                winner: None,
                tied: Vec::new(),
            }
        }
    };
    let top: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| *n == max)
        .map(|(target, _)| target)
        .collect();

    if top.len() == 1 {
        Resolution {
            winner: top.into_iter().next(),
            tied: Vec::new(),
        }
    } else {
        Resolution {
            winner: None,
            tied: top,
        }
    }
}

/// Night ties are broken uniformly at random, never escalated.
pub fn resolve_night<R: Rng + ?Sized>(ballots: &Ballots, rng: &mut R) -> Option<String> {
    let resolution = resolve(ballots);
    match resolution.winner {
        Some(winner) => Some(winner),
        None => resolution.tied.choose(rng).cloned(),
    }
}

pub fn resolve_day(ballots: &Ballots, is_runoff: bool) -> DayOutcome {
    let resolution = resolve(ballots);
    match (resolution.winner, is_runoff) {
        (Some(winner), _) => DayOutcome::Exile(winner),
        (None, _) if resolution.tied.is_empty() => DayOutcome::NoVotes,
        (None, false) => DayOutcome::Runoff(resolution.tied),
        (None, true) => DayOutcome::Deadlock(resolution.tied),
    }
}

/// Voter ids grouped by the target they chose.
pub fn voters_by_target(ballots: &Ballots) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (voter, target) in ballots {
        grouped.entry(target.clone()).or_default().push(voter.clone());
    }
    grouped
}
