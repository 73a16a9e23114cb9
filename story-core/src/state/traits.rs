//! Player personality traits.
//!
//! Every run tracks five fixed axes, each clamped to `0..=100`. Choices nudge
//! these values through their `traits_impact` deltas.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest value a trait can take.
pub const TRAIT_MIN: i32 = 0;

/// Highest value a trait can take.
pub const TRAIT_MAX: i32 = 100;

/// Starting value for every axis when nothing else is known.
pub const TRAIT_DEFAULT: i32 = 50;

/// One of the five personality axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trait {
    RiskTaking,
    Empathy,
    Pragmatism,
    Creativity,
    Leadership,
}

impl Trait {
    /// All axes in schema order.
    pub const ALL: [Trait; 5] = [
        Trait::RiskTaking,
        Trait::Empathy,
        Trait::Pragmatism,
        Trait::Creativity,
        Trait::Leadership,
    ];

    /// The JSON key for this axis.
    pub fn key(&self) -> &'static str {
        match self {
            Trait::RiskTaking => "riskTaking",
            Trait::Empathy => "empathy",
            Trait::Pragmatism => "pragmatism",
            Trait::Creativity => "creativity",
            Trait::Leadership => "leadership",
        }
    }

    /// Snake-case name, used in ending tags.
    pub fn slug(&self) -> &'static str {
        match self {
            Trait::RiskTaking => "risk_taking",
            Trait::Empathy => "empathy",
            Trait::Pragmatism => "pragmatism",
            Trait::Creativity => "creativity",
            Trait::Leadership => "leadership",
        }
    }

    /// Look up an axis by name.
    ///
    /// Accepts the camelCase key, the snake_case slug, and any casing of
    /// either. Unknown names return `None`.
    pub fn from_name(name: &str) -> Option<Trait> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "risktaking" => Some(Trait::RiskTaking),
            "empathy" => Some(Trait::Empathy),
            "pragmatism" => Some(Trait::Pragmatism),
            "creativity" => Some(Trait::Creativity),
            "leadership" => Some(Trait::Leadership),
            _ => None,
        }
    }
}

impl std::fmt::Display for Trait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// The five-axis personality vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityTraits {
    pub risk_taking: i32,
    pub empathy: i32,
    pub pragmatism: i32,
    pub creativity: i32,
    pub leadership: i32,
}

impl Default for PersonalityTraits {
    fn default() -> Self {
        Self::uniform(TRAIT_DEFAULT)
    }
}

impl PersonalityTraits {
    /// Every axis set to the same (clamped) value.
    pub fn uniform(value: i32) -> Self {
        let value = clamp_trait(value);
        Self {
            risk_taking: value,
            empathy: value,
            pragmatism: value,
            creativity: value,
            leadership: value,
        }
    }

    /// Read one axis.
    pub fn get(&self, axis: Trait) -> i32 {
        match axis {
            Trait::RiskTaking => self.risk_taking,
            Trait::Empathy => self.empathy,
            Trait::Pragmatism => self.pragmatism,
            Trait::Creativity => self.creativity,
            Trait::Leadership => self.leadership,
        }
    }

    /// Write one axis, clamping into range.
    pub fn set(&mut self, axis: Trait, value: i32) {
        let value = clamp_trait(value);
        match axis {
            Trait::RiskTaking => self.risk_taking = value,
            Trait::Empathy => self.empathy = value,
            Trait::Pragmatism => self.pragmatism = value,
            Trait::Creativity => self.creativity = value,
            Trait::Leadership => self.leadership = value,
        }
    }

    /// Builder-style axis setter.
    pub fn with(mut self, axis: Trait, value: i32) -> Self {
        self.set(axis, value);
        self
    }

    /// Iterate `(axis, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (Trait, i32)> + '_ {
        Trait::ALL.iter().map(move |t| (*t, self.get(*t)))
    }

    /// The axis with the highest value. Ties go to the earlier axis.
    pub fn dominant(&self) -> Trait {
        let mut best = Trait::RiskTaking;
        for (axis, value) in self.iter() {
            if value > self.get(best) {
                best = axis;
            }
        }
        best
    }

    /// Re-clamp every axis. Used after deserializing untrusted data.
    pub fn clamped(self) -> Self {
        let mut out = self;
        for axis in Trait::ALL {
            out.set(axis, self.get(axis));
        }
        out
    }

    /// Apply a choice's trait deltas.
    ///
    /// Only axes named in `impact` move; unknown names are ignored. Every
    /// result stays within `0..=100`.
    pub fn updated(&self, impact: &BTreeMap<String, i32>) -> Self {
        let mut next = *self;
        for (name, delta) in impact {
            match Trait::from_name(name) {
                Some(axis) => {
                    let value = self.get(axis).saturating_add(*delta);
                    next.set(axis, value);
                    tracing::debug!(trait_name = axis.key(), delta, value = next.get(axis), "trait updated");
                }
                None => {
                    tracing::debug!(trait_name = %name, "ignoring unknown trait in impact");
                }
            }
        }
        next
    }
}

/// Apply a choice's trait deltas to `current`, returning the new vector.
pub fn update_traits(current: &PersonalityTraits, impact: &BTreeMap<String, i32>) -> PersonalityTraits {
    current.updated(impact)
}

fn clamp_trait(value: i32) -> i32 {
    value.clamp(TRAIT_MIN, TRAIT_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impact(pairs: &[(&str, i32)]) -> BTreeMap<String, i32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_defaults_are_fifty() {
        let traits = PersonalityTraits::default();
        assert!(traits.iter().all(|(_, v)| v == 50));
    }

    #[test]
    fn test_update_only_touches_named_traits() {
        let traits = PersonalityTraits::default();
        let next = update_traits(&traits, &impact(&[("empathy", 2), ("riskTaking", -3)]));

        assert_eq!(next.empathy, 52);
        assert_eq!(next.risk_taking, 47);
        assert_eq!(next.pragmatism, 50);
        assert_eq!(next.creativity, 50);
        assert_eq!(next.leadership, 50);
        // Input untouched
        assert_eq!(traits.empathy, 50);
    }

    #[test]
    fn test_update_clamps() {
        let traits = PersonalityTraits::uniform(99).with(Trait::Empathy, 1);
        let next = traits.updated(&impact(&[("leadership", 3), ("empathy", -3)]));
        assert_eq!(next.leadership, 100);
        assert_eq!(next.empathy, 0);

        let extreme = traits.updated(&impact(&[("creativity", i32::MAX)]));
        assert_eq!(extreme.creativity, 100);
    }

    #[test]
    fn test_unknown_trait_ignored() {
        let traits = PersonalityTraits::default();
        let next = traits.updated(&impact(&[("charisma", 3)]));
        assert_eq!(next, traits);
    }

    #[test]
    fn test_trait_name_aliases() {
        assert_eq!(Trait::from_name("riskTaking"), Some(Trait::RiskTaking));
        assert_eq!(Trait::from_name("risk_taking"), Some(Trait::RiskTaking));
        assert_eq!(Trait::from_name("LEADERSHIP"), Some(Trait::Leadership));
        assert_eq!(Trait::from_name("luck"), None);
    }

    #[test]
    fn test_dominant_prefers_earlier_on_tie() {
        let traits = PersonalityTraits::default();
        assert_eq!(traits.dominant(), Trait::RiskTaking);

        let traits = traits.with(Trait::Creativity, 90);
        assert_eq!(traits.dominant(), Trait::Creativity);
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_value(PersonalityTraits::default()).unwrap();
        assert_eq!(json["riskTaking"], 50);
        assert!(json.get("risk_taking").is_none());
    }
}
