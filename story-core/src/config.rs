//! Story engine configuration.

use crate::narrator::NarratorConfig;
use std::str::FromStr;

/// Configuration for a [`StoryFlow`](crate::flow::StoryFlow) and its narrator.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// Model to use for the narrator.
    pub model: Option<String>,

    /// Maximum tokens per narrative beat.
    pub max_tokens: usize,

    /// Temperature for narrative generation.
    pub temperature: Option<f32>,

    /// Extra narrator instructions.
    pub custom_prompt: Option<String>,

    /// Seed for ending title selection. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self {
            model: None,
            max_tokens: 2048,
            temperature: Some(0.9),
            custom_prompt: None,
            seed: None,
        }
    }

    /// Read overrides from `STORY_MODEL`, `STORY_MAX_TOKENS`,
    /// `STORY_TEMPERATURE` and `STORY_SEED`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new();
        if let Some(model) = lookup("STORY_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = Some(model.trim().to_string());
        }
        if let Some(tokens) = parse_var(&lookup, "STORY_MAX_TOKENS") {
            config.max_tokens = tokens;
        }
        if let Some(temp) = parse_var(&lookup, "STORY_TEMPERATURE") {
            config.temperature = Some(temp);
        }
        if let Some(seed) = parse_var(&lookup, "STORY_SEED") {
            config.seed = Some(seed);
        }
        config
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set max tokens per beat.
    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    /// Set temperature for generation.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Fix the seed used for ending titles.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Append instructions to the narrator prompt.
    pub fn with_custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = Some(prompt.into());
        self
    }

    /// The narrator settings carried by this config.
    pub fn narrator_config(&self) -> NarratorConfig {
        NarratorConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            custom_system_prompt: self.custom_prompt.clone(),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}
