//! Choices offered to the player at each step.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Most choices a single step may offer.
pub const MAX_CHOICES: usize = 4;

/// Single-letter choice identifier, `A` through `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChoiceId(char);

impl ChoiceId {
    pub const A: ChoiceId = ChoiceId('A');
    pub const B: ChoiceId = ChoiceId('B');
    pub const C: ChoiceId = ChoiceId('C');
    pub const D: ChoiceId = ChoiceId('D');

    /// Parse an identifier, accepting lowercase letters.
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.trim().chars();
        let c = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() || !('A'..='D').contains(&c) {
            return None;
        }
        Some(ChoiceId(c))
    }

    /// The identifier for the n-th choice (0-based).
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= MAX_CHOICES {
            return None;
        }
        Some(ChoiceId((b'A' + index as u8) as char))
    }

    pub fn as_char(&self) -> char {
        self.0
    }
}

impl std::fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ChoiceId {
    type Error = ChoiceValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ChoiceId::parse(&value).ok_or(ChoiceValidationError::InvalidId(value))
    }
}

impl From<ChoiceId> for String {
    fn from(id: ChoiceId) -> Self {
        id.0.to_string()
    }
}

/// A generated option. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: ChoiceId,
    pub text: String,
    /// Stable snake_case identifier used for statistics.
    pub slug: String,
    /// Consequence directives, applied in order when chosen.
    #[serde(default)]
    pub consequences: Vec<String>,
    /// Trait name to signed delta.
    #[serde(default)]
    pub traits_impact: BTreeMap<String, i32>,
}

impl Choice {
    /// Create a choice with no consequences or trait impact.
    pub fn new(id: ChoiceId, text: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            slug: slug.into(),
            consequences: Vec::new(),
            traits_impact: BTreeMap::new(),
        }
    }

    /// Append a consequence directive.
    pub fn with_consequence(mut self, directive: impl Into<String>) -> Self {
        self.consequences.push(directive.into());
        self
    }

    /// Set a trait delta.
    pub fn with_trait_impact(mut self, trait_name: impl Into<String>, delta: i32) -> Self {
        self.traits_impact.insert(trait_name.into(), delta);
        self
    }

    /// Reject choices that cannot be offered to a player.
    pub fn validate(&self) -> Result<(), ChoiceValidationError> {
        if self.text.trim().is_empty() {
            return Err(ChoiceValidationError::EmptyText(self.id));
        }
        if self.slug.trim().is_empty() {
            return Err(ChoiceValidationError::EmptySlug(self.id));
        }
        Ok(())
    }
}

/// Problems with a generated choice set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChoiceValidationError {
    #[error("Invalid choice id '{0}' (expected A-D)")]
    InvalidId(String),

    #[error("Choice {0} has empty text")]
    EmptyText(ChoiceId),

    #[error("Choice {0} has empty slug")]
    EmptySlug(ChoiceId),

    #[error("Duplicate choice id {0}")]
    DuplicateId(ChoiceId),

    #[error("Expected between 1 and 4 choices, got {0}")]
    WrongCount(usize),
}

/// Validate a full choice set for a continuing step.
pub fn validate_choices(choices: &[Choice]) -> Result<(), ChoiceValidationError> {
    if choices.is_empty() || choices.len() > MAX_CHOICES {
        return Err(ChoiceValidationError::WrongCount(choices.len()));
    }
    let mut seen = Vec::with_capacity(choices.len());
    for choice in choices {
        choice.validate()?;
        if seen.contains(&choice.id) {
            return Err(ChoiceValidationError::DuplicateId(choice.id));
        }
        seen.push(choice.id);
    }
    Ok(())
}
