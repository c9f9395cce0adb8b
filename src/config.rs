use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_PRACTICE_QUESTIONS: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Engine {
    #[default]
    Gpt35Turbo,
    Gpt4,
    Gpt4_32k,
}

impl FromStr for Engine {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gpt-3.5-turbo" => Ok(Engine::Gpt35Turbo),
            "gpt-4" => Ok(Engine::Gpt4),
            "gpt-4-32k" => Ok(Engine::Gpt4_32k),
            other => Err(ConfigError::UnknownEngine(other.to_string())),
        }
    }
}

/// Process-wide settings. The Telegram token is read separately by
/// `Bot::from_env`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: String,
    pub engine: Engine,
    pub timeout: Duration,
    pub temperature: f32,
    pub practice_questions: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("CHATGPT_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("CHATGPT_API_KEY"))?;

        let engine = match lookup("CHATGPT_ENGINE") {
            Some(name) => name.parse()?,
            None => Engine::default(),
        };

        let timeout_secs = parse_var(&lookup, "CHATGPT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let temperature = parse_var(&lookup, "CHATGPT_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                var: "CHATGPT_TEMPERATURE",
                value: temperature.to_string(),
            });
        }
        let practice_questions = parse_var(&lookup, "PRACTICE_QUESTIONS", DEFAULT_PRACTICE_QUESTIONS)?;

        Ok(Self {
            api_key,
            engine,
            timeout: Duration::from_secs(timeout_secs),
            temperature,
            practice_questions,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
