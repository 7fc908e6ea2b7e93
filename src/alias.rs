//! Human-readable task aliases
//!
//! Aliases are `Adjective-Noun` pairs derived from the task UUID, assigned
//! once at creation and immutable afterwards. The core only depends on the
//! uniqueness contract expressed by [`AliasGenerator`]; the word-pair scheme
//! here is the default collaborator behind that seam.

use std::collections::HashSet;

use uuid::Uuid;

const ADJECTIVES: [&str; 40] = [
    "Ancient", "Blue", "Cosmic", "Dancing", "Electric", "Flying", "Green", "Happy", "Iron",
    "Jolly", "Kind", "Little", "Misty", "Neon", "Orange", "Purple", "Quiet", "Red", "Silent",
    "Tiny", "Urban", "Violet", "Wild", "Yellow", "Zealous", "Brave", "Calm", "Eager", "Fancy",
    "Gentle", "Heavy", "Icy", "Lucky", "Merry", "Noble", "Proud", "Rapid", "Sharp", "Tough",
    "Vivid",
];

const NOUNS: [&str; 40] = [
    "Bear", "Cat", "Dog", "Eagle", "Fox", "Goat", "Hawk", "Ibex", "Jay", "Koala", "Lion",
    "Mouse", "Newt", "Owl", "Pig", "Quail", "Rat", "Snake", "Tiger", "Urchin", "Viper", "Wolf",
    "Yak", "Zebra", "Apple", "Book", "Cloud", "Desk", "Echo", "Fire", "Gate", "Hill", "Island",
    "Jewel", "Kite", "Leaf", "Moon", "Note", "Ocean", "Path",
];

/// Pluggable alias naming collaborator.
///
/// Implementations must return an alias not present in `existing`; the
/// orchestrator passes the aliases of all live tasks at assignment time.
pub trait AliasGenerator {
    fn generate(&self, task_id: &Uuid, existing: &HashSet<String>) -> String;
}

/// Default word-pair alias scheme
#[derive(Debug, Clone, Copy, Default)]
pub struct WordPairAliases;

impl AliasGenerator for WordPairAliases {
    fn generate(&self, task_id: &Uuid, existing: &HashSet<String>) -> String {
        let combos = ADJECTIVES.len() * NOUNS.len();
        for salt in 0..combos {
            let candidate = alias_for(task_id, salt);
            if !existing.contains(&candidate) {
                return candidate;
            }
        }

        // Every word pair is taken; fall back to a suffix that cannot collide
        // with another task's alias.
        format!("{}-{}", alias_for(task_id, 0), task_id.simple())
    }
}

/// Deterministic word pair for a UUID; `salt` advances through the
/// combination space on collision.
fn alias_for(task_id: &Uuid, salt: usize) -> String {
    let bytes = task_id.as_bytes();
    let seed = bytes[0] as usize * 256 + bytes[1] as usize;
    let combined = (seed + salt) % (ADJECTIVES.len() * NOUNS.len());
    let adjective = ADJECTIVES[combined / NOUNS.len()];
    let noun = NOUNS[combined % NOUNS.len()];
    format!("{adjective}-{noun}")
}

/// Split an optional `-N` version suffix off an alias reference.
///
/// `"Misty-Rat-2"` becomes `("Misty-Rat", Some(2))`; plain aliases pass
/// through with `None`.
pub fn split_version_suffix(input: &str) -> (&str, Option<usize>) {
    if let Some((head, tail)) = input.rsplit_once('-') {
        if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(version) = tail.parse() {
                return (head, Some(version));
            }
        }
    }
    (input, None)
}

/// Resolve an alias reference (case-insensitive, optional version suffix)
/// against the live tasks' `(id, alias)` pairs.
pub fn resolve_alias(input: &str, candidates: &[(Uuid, String)]) -> Option<(Uuid, Option<usize>)> {
    let (name, version) = split_version_suffix(input);
    candidates
        .iter()
        .find(|(_, alias)| alias.eq_ignore_ascii_case(name))
        .map(|(id, _)| (*id, version))
}
