//! Slug and decision-key helpers for choice statistics.
//!
//! Statistics are keyed by a step's representative slug. Because the same
//! slug can show up in unrelated narrative branches, steps also carry a
//! decision key: a 32-bit rolling hash over the run, step number and choice
//! texts. The hash is a tie-break aid, not a security boundary.

use crate::choice::Choice;

/// Slug used for a step that offers no choices (an ending).
pub const NO_CHOICES_SLUG: &str = "no_choices";

/// The representative slug for a step's choice set.
pub fn generate_step_choice_slug(choices: &[Choice]) -> String {
    choices
        .first()
        .map(|c| c.slug.clone())
        .unwrap_or_else(|| NO_CHOICES_SLUG.to_string())
}

/// Deterministic hex hash identifying one decision point.
pub fn generate_decision_key_hash(run_id: &str, step_number: u32, choices: &[Choice]) -> String {
    let joined = choices
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("|");
    let input = format!("{run_id}:{step_number}:{joined}");
    format!("{:08x}", rolling_hash(&input))
}

/// Multiply-by-31 rolling hash over UTF-16 code units, wrapping at 32 bits.
fn rolling_hash(input: &str) -> u32 {
    input
        .encode_utf16()
        .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as u32))
}

/// Turn free text into a snake_case slug.
///
/// Non-alphanumeric runs collapse into a single underscore. An input with no
/// usable characters yields an empty string.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_underscore = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_underscore && !slug.is_empty() {
                slug.push('_');
            }
            pending_underscore = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_underscore = true;
        }
    }
    slug
}
