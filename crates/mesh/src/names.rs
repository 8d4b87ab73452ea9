// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Themed peer name generation.
//!
//! Names are `adjective-noun`, drawn from the configured theme's word lists
//! (or the caller's custom lists). Collisions against live peers get a
//! numeric suffix.

use pim_core::{MessengerConfig, NameWords};
use std::collections::hash_map::RandomState;
use std::collections::HashSet;
use std::hash::{BuildHasher, Hasher};

const ANIMAL_ADJECTIVES: &[&str] = &[
    "amber", "brisk", "clever", "crimson", "dusty", "eager", "fuzzy", "gentle", "hazel", "ivory",
    "jolly", "keen", "lively", "mellow", "nimble", "olive", "plucky", "quiet", "rusty", "swift",
    "tawny", "umber", "vivid", "wily",
];

const ANIMAL_NOUNS: &[&str] = &[
    "badger", "crane", "dingo", "egret", "ferret", "gecko", "heron", "ibis", "jackal", "kestrel",
    "lemur", "marmot", "newt", "ocelot", "puffin", "quokka", "raven", "stoat", "tapir", "urchin",
    "vole", "wombat", "yak", "zebu",
];

const SPACE_ADJECTIVES: &[&str] = &[
    "astral", "binary", "cosmic", "distant", "eccentric", "gibbous", "helio", "ionized", "lunar",
    "nebular", "orbital", "polar", "quasi", "radiant", "sidereal", "stellar", "umbral", "zenith",
];

const SPACE_NOUNS: &[&str] = &[
    "comet", "dwarf", "eclipse", "flare", "galaxy", "halo", "meteor", "nova", "parsec", "pulsar",
    "quasar", "rocket", "saturn", "transit", "vega", "zodiac",
];

fn theme_words(config: &MessengerConfig) -> (Vec<String>, Vec<String>) {
    let NameWords { adjectives, nouns } = &config.name_words;
    if !adjectives.is_empty() && !nouns.is_empty() {
        return (adjectives.clone(), nouns.clone());
    }
    let (a, n): (&[&str], &[&str]) = match config.name_theme.as_str() {
        "space" => (SPACE_ADJECTIVES, SPACE_NOUNS),
        _ => (ANIMAL_ADJECTIVES, ANIMAL_NOUNS),
    };
    (a.iter().map(|s| s.to_string()).collect(), n.iter().map(|s| s.to_string()).collect())
}

fn entropy() -> u64 {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u32(std::process::id());
    hasher.write_u128(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default(),
    );
    hasher.finish()
}

/// Pick a themed name not present in `taken`.
pub fn generate(config: &MessengerConfig, taken: &HashSet<String>) -> String {
    let (adjectives, nouns) = theme_words(config);
    let mut seed = entropy();
    for _ in 0..64 {
        let adj = &adjectives[(seed % adjectives.len() as u64) as usize];
        seed = seed.rotate_left(17).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        let noun = &nouns[(seed % nouns.len() as u64) as usize];
        seed = seed.rotate_left(23).wrapping_add(1);
        let name = format!("{adj}-{noun}");
        if !taken.contains(&name) {
            return name;
        }
    }
    // Word lists exhausted against this mesh: disambiguate numerically.
    let mut n = 2;
    loop {
        let name = format!("{}-{}-{}", adjectives[0], nouns[0], n);
        if !taken.contains(&name) {
            return name;
        }
        n += 1;
    }
}

#[cfg(test)]
#[path = "names_tests.rs"]
mod tests;
