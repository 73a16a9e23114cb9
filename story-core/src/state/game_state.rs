//! The mutable narrative document carried from step to step.

use super::traits::{PersonalityTraits, Trait, TRAIT_DEFAULT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Lowest relationship score.
pub const RELATIONSHIP_MIN: i32 = -100;

/// Highest relationship score.
pub const RELATIONSHIP_MAX: i32 = 100;

/// Narrative state for one story run.
///
/// Mutations never happen in place from the outside: every rule returns a
/// fresh `GameState`, so step snapshots stay trustworthy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Current act, starting at 1. Never decreases.
    pub act: u32,
    /// Boolean narrative facts.
    pub flags: BTreeSet<String>,
    /// Character name to affinity in `-100..=100`. Absent means 0.
    pub relationships: BTreeMap<String, i32>,
    /// Item identifiers the player carries.
    pub inventory: BTreeSet<String>,
    /// The player's personality vector.
    pub personality_traits: PersonalityTraits,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            act: 1,
            flags: BTreeSet::new(),
            relationships: BTreeMap::new(),
            inventory: BTreeSet::new(),
            personality_traits: PersonalityTraits::default(),
        }
    }
}

impl GameState {
    /// A fresh act-one state with default traits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the personality vector.
    pub fn with_traits(mut self, traits: PersonalityTraits) -> Self {
        self.personality_traits = traits;
        self
    }

    /// Add a flag (builder style).
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.insert(flag.into());
        self
    }

    /// Set a relationship (builder style, clamped).
    pub fn with_relationship(mut self, character: impl Into<String>, value: i32) -> Self {
        self.relationships
            .insert(character.into(), clamp_relationship(value));
        self
    }

    /// Add an inventory item (builder style).
    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.inventory.insert(item.into());
        self
    }

    /// Set the act (builder style, minimum 1).
    pub fn with_act(mut self, act: u32) -> Self {
        self.act = act.max(1);
        self
    }

    /// Check whether a flag is set.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Relationship with a character, defaulting to 0.
    pub fn relationship(&self, character: &str) -> i32 {
        self.relationships.get(character).copied().unwrap_or(0)
    }

    /// Check whether an item is carried.
    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.contains(item)
    }

    /// Count flags whose name contains any of the given fragments.
    pub fn count_flags_containing(&self, fragments: &[&str]) -> usize {
        self.flags
            .iter()
            .filter(|flag| {
                let lower = flag.to_lowercase();
                fragments.iter().any(|f| lower.contains(f))
            })
            .count()
    }

    /// Check whether any flag contains any of the given fragments.
    pub fn any_flag_containing(&self, fragments: &[&str]) -> bool {
        self.count_flags_containing(fragments) > 0
    }

    /// Parse untrusted JSON into a validated state.
    ///
    /// This is the only lenient conversion point. Missing or malformed fields
    /// fall back to defaults, numbers are clamped, and non-string entries in
    /// `flags`/`inventory` are dropped. Anything that is not an object yields
    /// the default state.
    pub fn from_json_lenient(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let act = obj
            .get("act")
            .and_then(as_integer)
            .map(|a| a.clamp(1, u32::MAX as i64) as u32)
            .unwrap_or(1);

        let flags = obj.get("flags").map(string_set).unwrap_or_default();
        let inventory = obj.get("inventory").map(string_set).unwrap_or_default();

        let relationships = obj
            .get("relationships")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(name, v)| {
                        as_integer(v).map(|n| {
                            let n = n.clamp(RELATIONSHIP_MIN as i64, RELATIONSHIP_MAX as i64);
                            (name.clone(), n as i32)
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let personality_traits = obj
            .get("personalityTraits")
            .or_else(|| obj.get("personality_traits"))
            .map(traits_lenient)
            .unwrap_or_default();

        Self {
            act,
            flags,
            relationships,
            inventory,
            personality_traits,
        }
    }

    /// Re-apply every clamp. Used on states received from collaborators.
    pub fn normalized(mut self) -> Self {
        self.act = self.act.max(1);
        for value in self.relationships.values_mut() {
            *value = clamp_relationship(*value);
        }
        self.personality_traits = self.personality_traits.clamped();
        self
    }
}

/// Parse an untrusted trait object, filling missing axes with the default.
pub fn traits_lenient(value: &Value) -> PersonalityTraits {
    let mut traits = PersonalityTraits::default();
    let Some(obj) = value.as_object() else {
        return traits;
    };
    for axis in Trait::ALL {
        let raw = obj
            .get(axis.key())
            .or_else(|| obj.get(axis.slug()))
            .and_then(as_integer)
            .unwrap_or(TRAIT_DEFAULT as i64);
        traits.set(axis, raw.clamp(i32::MIN as i64, i32::MAX as i64) as i32);
    }
    traits
}

/// Read an untrusted whole number, rounding fractions and accepting numeric
/// strings.
pub fn integer_lenient(value: &Value) -> Option<i32> {
    as_integer(value).map(|n| n.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

pub(crate) fn clamp_relationship(value: i32) -> i32 {
    value.clamp(RELATIONSHIP_MIN, RELATIONSHIP_MAX)
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn string_set(value: &Value) -> BTreeSet<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
