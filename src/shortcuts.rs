//! Single-character shortcut assignment
//!
//! Hands out one keyboard character per name, keeping every key unique across
//! the batch, honouring fixed (manual) keys where they don't collide, and
//! preferring characters that are rare across the names being assigned.
//!
//! ## Example
//!
//! ```
//! use splotty::shortcuts::{assign, AssignOptions};
//! use std::collections::{BTreeMap, HashSet};
//!
//! let names = vec!["apple".to_string(), "banana".to_string(), "cherry".to_string()];
//! let result = assign(&names, &HashSet::new(), &BTreeMap::new(), &AssignOptions::immediate());
//! assert_eq!(result.keys.len(), 3);
//! assert!(result.is_complete());
//! ```

use log::warn;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Pause applied after reporting manual-key conflicts so they can be read.
pub const DEFAULT_CONFLICT_PAUSE: Duration = Duration::from_millis(1000);

/// Why a manual key was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// Another manual entry uses the same key
    Duplicate,
    /// The key is reserved or already taken elsewhere
    Excluded,
}

/// A manual key that was dropped; its name went through auto-assignment instead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutConflict {
    pub name: String,
    pub key: char,
    pub reason: ConflictReason,
}

/// Raised when the candidate pool runs dry before every name has a key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no shortcut keys left for: {}", names.join(", "))]
pub struct ShortcutExhaustion {
    pub names: Vec<String>,
}

/// Options controlling an assignment run
#[derive(Debug, Clone)]
pub struct AssignOptions {
    /// Sleep after conflict diagnostics. Zero skips the sleep.
    pub conflict_pause: Duration,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            conflict_pause: DEFAULT_CONFLICT_PAUSE,
        }
    }
}

impl AssignOptions {
    /// Options with no conflict pause
    pub fn immediate() -> Self {
        Self {
            conflict_pause: Duration::ZERO,
        }
    }
}

/// Outcome of an assignment run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    /// Name to key, for every name that received one
    pub keys: BTreeMap<String, char>,
    /// Manual keys that were dropped
    pub conflicts: Vec<ShortcutConflict>,
    /// Names left without a key
    pub exhausted: Option<ShortcutExhaustion>,
}

impl Assignment {
    pub fn get(&self, name: &str) -> Option<char> {
        self.keys.get(name).copied()
    }

    /// Every key handed out by this run
    pub fn used_keys(&self) -> impl Iterator<Item = char> + '_ {
        self.keys.values().copied()
    }

    pub fn is_complete(&self) -> bool {
        self.exhausted.is_none()
    }
}

/// Characters the heuristic works with
fn is_shortcut_char(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit()
}

/// Candidate keys in preference order: a-z, 0-9, A-Z
pub fn candidate_pool() -> impl Iterator<Item = char> {
    ('a'..='z').chain('0'..='9').chain('A'..='Z')
}

/// Per-character commonality over `names`. Lower is rarer and preferred.
///
/// Each occurrence at position `i` adds `max(1, L - i) / L`, where `L` is the
/// length found at the 75th percentile of the sorted lengths. Totals are
/// divided by the number of names.
pub fn commonality_scores(names: &[&str]) -> HashMap<char, f64> {
    let mut scores = HashMap::new();
    if names.is_empty() {
        return scores;
    }

    let mut lengths: Vec<usize> = names.iter().map(|n| n.chars().count()).collect();
    lengths.sort_unstable();
    let idx = (lengths.len() * 3 / 4).min(lengths.len() - 1);
    let reference = lengths[idx].max(1) as f64;

    for name in names {
        for (i, ch) in name.chars().enumerate() {
            if !is_shortcut_char(ch) {
                continue;
            }
            let weight = (reference - i as f64).max(1.0) / reference;
            *scores.entry(ch).or_insert(0.0) += weight;
        }
    }

    let count = names.len() as f64;
    for score in scores.values_mut() {
        *score /= count;
    }
    scores
}

/// Assign a unique key to every name.
///
/// `manual` entries are kept unless two of them share a key or the key is in
/// `exclude`; dropped entries are reported in [`Assignment::conflicts`] and
/// their names are auto-assigned after the names in `names`. Assignment runs
/// in input order and each key is consumed immediately, so the result depends
/// only on the inputs.
pub fn assign(
    names: &[String],
    exclude: &HashSet<char>,
    manual: &BTreeMap<String, char>,
    options: &AssignOptions,
) -> Assignment {
    let mut result = Assignment::default();

    let mut key_counts: HashMap<char, usize> = HashMap::new();
    for key in manual.values().chain(exclude.iter()) {
        *key_counts.entry(*key).or_insert(0) += 1;
    }

    for (name, &key) in manual {
        if exclude.contains(&key) {
            result.conflicts.push(ShortcutConflict {
                name: name.clone(),
                key,
                reason: ConflictReason::Excluded,
            });
        } else if key_counts.get(&key).copied().unwrap_or(0) > 1 {
            result.conflicts.push(ShortcutConflict {
                name: name.clone(),
                key,
                reason: ConflictReason::Duplicate,
            });
        } else {
            result.keys.insert(name.clone(), key);
        }
    }

    if !result.conflicts.is_empty() {
        for conflict in &result.conflicts {
            warn!(
                "shortcut '{}' for {} dropped ({:?}), reassigning",
                conflict.key, conflict.name, conflict.reason
            );
        }
        if !options.conflict_pause.is_zero() {
            thread::sleep(options.conflict_pause);
        }
    }

    let mut pending: Vec<&str> = Vec::new();
    for name in names
        .iter()
        .map(String::as_str)
        .chain(result.conflicts.iter().map(|c| c.name.as_str()))
    {
        if !result.keys.contains_key(name) && !pending.contains(&name) {
            pending.push(name);
        }
    }

    let scores = commonality_scores(&pending);
    let score_of = |ch: &char| scores.get(ch).copied().unwrap_or(0.0);

    let mut used: HashSet<char> = exclude.iter().copied().collect();
    used.extend(result.keys.values().copied());
    let pool: Vec<char> = candidate_pool().filter(|c| !used.contains(c)).collect();

    let mut unassigned = Vec::new();
    for name in pending {
        let mut own: Vec<char> = name.chars().filter(|c| is_shortcut_char(*c)).collect();
        own.sort_by(|a, b| score_of(a).total_cmp(&score_of(b)));

        let chosen = own
            .into_iter()
            .find(|c| !used.contains(c) && pool.contains(c))
            .or_else(|| pool.iter().copied().find(|c| !used.contains(c)));

        match chosen {
            Some(key) => {
                used.insert(key);
                result.keys.insert(name.to_string(), key);
            }
            None => unassigned.push(name.to_string()),
        }
    }

    if !unassigned.is_empty() {
        let exhaustion = ShortcutExhaustion { names: unassigned };
        warn!("{}", exhaustion);
        result.exhausted = Some(exhaustion);
    }

    result
}
