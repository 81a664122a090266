//! Error types for scene loading, validation and evaluation

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::layout::SolverError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("failed to read scene: {0}")]
    Io(#[from] std::io::Error),

    #[error("scene syntax error: {message}")]
    Syntax { message: String, span: Option<Span> },

    #[error("failed to serialize scene: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown asset '{name}' in {context}{}", format_suggestions(.suggestions))]
    UnknownAsset {
        name: String,
        context: String,
        suggestions: Vec<String>,
    },

    #[error("asset '{0}' is defined more than once")]
    DuplicateAsset(String),

    #[error("invalid asset '{id}': {reason}")]
    InvalidAsset { id: String, reason: String },

    #[error("invalid room: {0}")]
    InvalidRoom(String),

    #[error("constraint {constraint} does not involve any trainable asset")]
    ConstraintWithoutGradient { constraint: String },

    #[error("projection failed: {0}")]
    Projection(#[from] SolverError),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

impl SceneError {
    pub fn unknown_asset(
        name: impl Into<String>,
        context: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self::UnknownAsset {
            name: name.into(),
            context: context.into(),
            suggestions,
        }
    }

    pub fn invalid_asset(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAsset {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Byte range of the offending text, when known
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::Syntax { span, .. } => span.as_ref(),
            _ => None,
        }
    }

    /// Format the error with source context using ariadne.
    ///
    /// Errors without a span fall back to their plain message.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let (Self::Syntax { message, .. }, Some(span)) = (self, self.span()) else {
            return self.to_string();
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message("invalid scene file")
            .with_label(
                Label::new((filename, span.clone()))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| self.to_string()),
            Err(_) => self.to_string(),
        }
    }
}

impl From<toml::de::Error> for SceneError {
    fn from(err: toml::de::Error) -> Self {
        SceneError::Syntax {
            message: err.message().trim().to_string(),
            span: err.span(),
        }
    }
}
