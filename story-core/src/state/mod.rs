//! Game state and personality traits.

mod game_state;
mod traits;

pub use game_state::{integer_lenient, traits_lenient, GameState, RELATIONSHIP_MAX, RELATIONSHIP_MIN};
pub(crate) use game_state::clamp_relationship;
pub use traits::{update_traits, PersonalityTraits, Trait, TRAIT_DEFAULT, TRAIT_MAX, TRAIT_MIN};
