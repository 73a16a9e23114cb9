//! Consequence directives and how they fold into game state.
//!
//! Generated choices carry consequences as colon-delimited strings such as
//! `add_flag:met_wizard` or `modify_relationship:wizard:10`. They are parsed
//! once into the closed [`Consequence`] enum and applied with an exhaustive
//! match, so a new action is a compile-checked change.
//!
//! Malformed or unknown directives never abort a choice. They are skipped,
//! logged, and reported back in [`ConsequenceReport::skipped`].

use crate::choice::Choice;
use crate::state::{clamp_relationship, GameState, PersonalityTraits};
use thiserror::Error;

/// Flags whose first appearance moves the story into the next act.
pub const MILESTONE_FLAGS: [&str; 3] = ["completed_first_quest", "reached_midpoint", "final_confrontation"];

/// A parsed consequence directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consequence {
    /// Set a narrative flag.
    AddFlag(String),
    /// Clear a narrative flag.
    RemoveFlag(String),
    /// Set a relationship to an absolute value.
    SetRelationship { character: String, value: i32 },
    /// Shift a relationship by a delta.
    ModifyRelationship { character: String, delta: i32 },
    /// Add an inventory item.
    AddItem(String),
    /// Remove an inventory item.
    RemoveItem(String),
    /// Advance to the next act.
    IncrementAct,
}

/// Why a directive string could not be turned into a [`Consequence`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("Empty directive")]
    Empty,

    #[error("Unknown consequence action '{0}'")]
    UnknownAction(String),

    #[error("Directive '{action}' is missing its {missing} parameter")]
    MissingParameter {
        action: &'static str,
        missing: &'static str,
    },

    #[error("Directive '{action}' has a non-numeric amount '{value}'")]
    InvalidNumber { action: &'static str, value: String },
}

impl Consequence {
    /// Parse a directive string.
    ///
    /// `set_relationship` with a non-numeric value sets the relationship to 0.
    /// `modify_relationship` with a non-numeric delta is an error.
    pub fn parse(directive: &str) -> Result<Self, DirectiveError> {
        let directive = directive.trim();
        if directive.is_empty() {
            return Err(DirectiveError::Empty);
        }

        let mut parts = directive.split(':').map(str::trim);
        let action = parts.next().unwrap_or_default();
        let first = parts.next().filter(|p| !p.is_empty());
        let second = parts.next().filter(|p| !p.is_empty());

        match action {
            "add_flag" => Ok(Consequence::AddFlag(require(first, "add_flag", "flag")?)),
            "remove_flag" => Ok(Consequence::RemoveFlag(require(first, "remove_flag", "flag")?)),
            "add_item" => Ok(Consequence::AddItem(require(first, "add_item", "item")?)),
            "remove_item" => Ok(Consequence::RemoveItem(require(first, "remove_item", "item")?)),
            "set_relationship" => {
                let character = require(first, "set_relationship", "character")?;
                let value = second.and_then(parse_amount).unwrap_or(0);
                Ok(Consequence::SetRelationship { character, value })
            }
            "modify_relationship" => {
                let character = require(first, "modify_relationship", "character")?;
                let raw = require(second, "modify_relationship", "delta")?;
                let delta = parse_amount(&raw).ok_or(DirectiveError::InvalidNumber {
                    action: "modify_relationship",
                    value: raw,
                })?;
                Ok(Consequence::ModifyRelationship { character, delta })
            }
            "increment_act" => Ok(Consequence::IncrementAct),
            other => Err(DirectiveError::UnknownAction(other.to_string())),
        }
    }

    /// Apply this consequence, returning a new state.
    pub fn apply(&self, state: &GameState) -> GameState {
        let mut next = state.clone();
        match self {
            Consequence::AddFlag(flag) => {
                next.flags.insert(flag.clone());
            }
            Consequence::RemoveFlag(flag) => {
                next.flags.remove(flag);
            }
            Consequence::SetRelationship { character, value } => {
                next.relationships
                    .insert(character.clone(), clamp_relationship(*value));
            }
            Consequence::ModifyRelationship { character, delta } => {
                let current = next.relationship(character);
                next.relationships.insert(
                    character.clone(),
                    clamp_relationship(current.saturating_add(*delta)),
                );
            }
            Consequence::AddItem(item) => {
                next.inventory.insert(item.clone());
            }
            Consequence::RemoveItem(item) => {
                next.inventory.remove(item);
            }
            Consequence::IncrementAct => {
                next.act = next.act.saturating_add(1);
            }
        }
        next
    }
}

fn require(
    part: Option<&str>,
    action: &'static str,
    missing: &'static str,
) -> Result<String, DirectiveError> {
    part.map(str::to_string)
        .ok_or(DirectiveError::MissingParameter { action, missing })
}

fn parse_amount(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    raw.parse::<i32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i32))
}

/// A directive that was skipped during application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDirective {
    pub directive: String,
    pub reason: DirectiveError,
}

/// Result of folding a list of directives into a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsequenceReport {
    /// The resulting state.
    pub state: GameState,
    /// Directives that were ignored, in order.
    pub skipped: Vec<SkippedDirective>,
    /// Whether a milestone flag advanced the act.
    pub milestone_reached: bool,
}

/// Apply a single directive string.
///
/// Unknown or malformed directives leave the state unchanged and are logged.
pub fn apply_consequence(state: &GameState, directive: &str) -> GameState {
    match Consequence::parse(directive) {
        Ok(consequence) => consequence.apply(state),
        Err(reason) => {
            tracing::warn!(directive, %reason, "skipping consequence directive");
            state.clone()
        }
    }
}

/// Apply every directive attached to a choice, then check milestones.
///
/// The act advances once more if a milestone flag is present afterwards that
/// was not present before. This is narrower than advancing whenever a
/// milestone flag is present: a milestone carried over from an earlier step,
/// or re-added by a directive, does not advance the act again.
pub fn apply_consequences(state: &GameState, directives: &[String]) -> ConsequenceReport {
    let mut next = state.clone();
    let mut skipped = Vec::new();

    for directive in directives {
        match Consequence::parse(directive) {
            Ok(consequence) => next = consequence.apply(&next),
            Err(reason) => {
                tracing::warn!(directive = %directive, %reason, "skipping consequence directive");
                skipped.push(SkippedDirective {
                    directive: directive.clone(),
                    reason,
                });
            }
        }
    }

    let milestone_reached = MILESTONE_FLAGS
        .iter()
        .any(|flag| next.has_flag(flag) && !state.has_flag(flag));
    if milestone_reached {
        next.act = next.act.saturating_add(1);
        tracing::debug!(act = next.act, "milestone reached, advancing act");
    }

    ConsequenceReport {
        state: next,
        skipped,
        milestone_reached,
    }
}

/// Fold a chosen option into the state: consequences first, then traits.
pub fn apply_choice(state: &GameState, choice: &Choice) -> GameState {
    let report = apply_consequences(state, &choice.consequences);
    let traits: PersonalityTraits = report
        .state
        .personality_traits
        .updated(&choice.traits_impact);
    report.state.with_traits(traits)
}
