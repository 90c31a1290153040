use thiserror::Error;

use crate::extractor::error::ExtractorError;

#[derive(Debug, Error)]
pub enum JsError {
    #[error("Failed to create JS runtime: {0}")]
    RuntimeCreation(String),
    #[error("Failed to create JS context: {0}")]
    ContextCreation(String),
    #[error("JS evaluation failed: {message}{}", .stack.as_deref().map(|s| format!("\nStack: {s}")).unwrap_or_default())]
    Evaluation {
        message: String,
        stack: Option<String>,
    },
    #[error("no JavaScript engine available")]
    Unavailable,
}

impl JsError {
    pub fn eval(message: impl Into<String>) -> Self {
        JsError::Evaluation {
            message: message.into(),
            stack: None,
        }
    }

    pub fn eval_with_stack(message: impl Into<String>, stack: impl Into<String>) -> Self {
        JsError::Evaluation {
            message: message.into(),
            stack: Some(stack.into()),
        }
    }
}

impl From<JsError> for ExtractorError {
    fn from(err: JsError) -> Self {
        ExtractorError::JsError(err.to_string())
    }
}

#[cfg(feature = "rquickjs")]
impl From<rquickjs::Error> for JsError {
    fn from(err: rquickjs::Error) -> Self {
        JsError::eval(err.to_string())
    }
}
