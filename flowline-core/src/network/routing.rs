//! Successor candidates, selection modes and input-buffer registrations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ElementId;
use crate::errors::ConfigError;
use crate::random::RandomSource;

/// How an element picks among its unblocked successors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Uniformly random candidate
    #[default]
    Default,
    /// Highest weight wins, first registered on ties
    Priority,
    /// Weights are probabilities; the remainder up to 1 routes nowhere
    Chance,
}

impl FromStr for SelectionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(SelectionMode::Default),
            "priority" => Ok(SelectionMode::Priority),
            "chance" => Ok(SelectionMode::Chance),
            _ => Err(ConfigError::UnknownSelectionMode {
                mode: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Default => write!(f, "default"),
            SelectionMode::Priority => write!(f, "priority"),
            SelectionMode::Chance => write!(f, "chance"),
        }
    }
}

/// One weighted successor candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Successor {
    pub target: ElementId,
    pub weight: f64,
}

/// Ordered successor candidates plus selection mode.
#[derive(Debug, Clone, Default)]
pub struct Successors {
    entries: Vec<Successor>,
    mode: SelectionMode,
}

impl Successors {
    pub(crate) fn push(&mut self, target: ElementId, weight: f64) {
        self.entries.push(Successor { target, weight });
    }

    pub(crate) fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    /// Candidates in registration order.
    pub fn entries(&self) -> &[Successor] {
        &self.entries
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A buffer a station (or a downstream buffer) pulls from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InputBuffer {
    pub buffer: ElementId,
    pub priority: f64,
}

/// Applies `mode` to the already-filtered candidates.
pub(crate) fn select(
    mode: SelectionMode,
    candidates: &[Successor],
    rng: &mut RandomSource,
) -> Option<ElementId> {
    if candidates.is_empty() {
        return None;
    }

    match mode {
        SelectionMode::Default => {
            let index = rng.random_index(candidates.len());
            candidates.get(index).map(|successor| successor.target)
        }
        SelectionMode::Priority => {
            let mut best = candidates[0];
            for candidate in &candidates[1..] {
                if candidate.weight > best.weight {
                    best = *candidate;
                }
            }
            Some(best.target)
        }
        SelectionMode::Chance => {
            let draw = rng.random_f64();
            let mut cumulative = 0.0;
            for candidate in candidates {
                cumulative += candidate.weight;
                if draw < cumulative {
                    return Some(candidate.target);
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(weights: &[f64]) -> Vec<Successor> {
        weights
            .iter()
            .enumerate()
            .map(|(index, &weight)| Successor {
                target: ElementId::new(index),
                weight,
            })
            .collect()
    }

    #[test]
    fn test_selection_mode_parsing() {
        assert_eq!("priority".parse::<SelectionMode>(), Ok(SelectionMode::Priority));
        assert_eq!("chance".parse::<SelectionMode>(), Ok(SelectionMode::Chance));
        assert_eq!("default".parse::<SelectionMode>(), Ok(SelectionMode::Default));
        assert!(matches!(
            "roundrobin".parse::<SelectionMode>(),
            Err(ConfigError::UnknownSelectionMode { .. })
        ));
    }

    #[test]
    fn test_priority_picks_highest_weight() {
        let mut rng = RandomSource::from_seed(1);
        let candidates = candidates(&[3.0, 1.0, 2.0]);
        for _ in 0..100 {
            assert_eq!(
                select(SelectionMode::Priority, &candidates, &mut rng),
                Some(ElementId::new(0))
            );
        }
    }

    #[test]
    fn test_priority_ties_go_to_first_registered() {
        let mut rng = RandomSource::from_seed(1);
        let candidates = candidates(&[1.0, 5.0, 5.0]);
        assert_eq!(
            select(SelectionMode::Priority, &candidates, &mut rng),
            Some(ElementId::new(1))
        );
    }

    #[test]
    fn test_chance_split_is_even() {
        let mut rng = RandomSource::from_seed(99);
        let candidates = candidates(&[0.5, 0.5]);
        let draws = 100_000;
        let first = (0..draws)
            .filter(|_| {
                select(SelectionMode::Chance, &candidates, &mut rng) == Some(ElementId::new(0))
            })
            .count();
        let share = first as f64 / draws as f64;
        assert!((share - 0.5).abs() < 0.01, "share was {share}");
    }

    #[test]
    fn test_chance_with_partial_weights_can_route_nowhere() {
        let mut rng = RandomSource::from_seed(5);
        let candidates = candidates(&[0.2]);
        let misses = (0..10_000)
            .filter(|_| select(SelectionMode::Chance, &candidates, &mut rng).is_none())
            .count();
        assert!(misses > 7_000 && misses < 9_000, "misses: {misses}");
    }

    #[test]
    fn test_default_covers_every_candidate() {
        let mut rng = RandomSource::from_seed(3);
        let candidates = candidates(&[0.0, 0.0, 0.0]);
        let mut seen = [false; 3];
        for _ in 0..300 {
            if let Some(id) = select(SelectionMode::Default, &candidates, &mut rng) {
                seen[id.index()] = true;
            }
        }
        assert_eq!(seen, [true, true, true]);
    }

    #[test]
    fn test_empty_candidates() {
        let mut rng = RandomSource::from_seed(3);
        assert_eq!(select(SelectionMode::Default, &[], &mut rng), None);
        assert_eq!(select(SelectionMode::Priority, &[], &mut rng), None);
        assert_eq!(select(SelectionMode::Chance, &[], &mut rng), None);
    }
}
