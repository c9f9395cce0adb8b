use thiserror::Error;

/// The model could not produce text we can use.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model request failed: {0}")]
    Model(#[from] chatgpt::err::Error),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model output had no answer choices")]
    Unusable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {action} while the quiz is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("unknown model engine {0:?}, expected gpt-3.5-turbo, gpt-4 or gpt-4-32k")]
    UnknownEngine(String),
}
