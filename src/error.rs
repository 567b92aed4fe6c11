//! Failure taxonomy for the outreach pipeline.
//!
//! Errors travel as `anyhow::Error`. The typed variants below are attached at
//! the point of failure and recovered with [`error_kind`] when a caller needs
//! to decide whether a batch can keep going.
use std::fmt;

/// Coarse classification used by the per-contact error policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigurationMissing,
    ContentGeneration,
    StructuralValidation,
    RecordNotFound,
    Delivery,
}

#[derive(Debug)]
pub enum OutreachError {
    /// A required credential or setting is absent.
    ConfigurationMissing { key: String },
    /// The chat provider answered without usable content.
    ContentGenerationFailure { prompt_name: String },
    /// The body envelope was still malformed after the repair budget.
    StructuralValidationFailure { attempts: usize },
    /// A lookup by id or recipient yielded nothing.
    RecordNotFound { lookup: String },
    /// The delivery provider rejected the send.
    DeliveryFailure { recipient: String, reason: String },
}

impl OutreachError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigurationMissing { .. } => ErrorKind::ConfigurationMissing,
            Self::ContentGenerationFailure { .. } => ErrorKind::ContentGeneration,
            Self::StructuralValidationFailure { .. } => ErrorKind::StructuralValidation,
            Self::RecordNotFound { .. } => ErrorKind::RecordNotFound,
            Self::DeliveryFailure { .. } => ErrorKind::Delivery,
        }
    }

    pub(crate) fn missing_config(key: &str) -> Self {
        Self::ConfigurationMissing {
            key: key.to_string(),
        }
    }

    pub(crate) fn not_found(lookup: impl Into<String>) -> Self {
        Self::RecordNotFound {
            lookup: lookup.into(),
        }
    }
}

impl fmt::Display for OutreachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigurationMissing { key } => {
                write!(f, "{key} is not set; export it or add it to the environment")
            }
            Self::ContentGenerationFailure { prompt_name } => {
                write!(f, "no content in chat response for {prompt_name:?}")
            }
            Self::StructuralValidationFailure { attempts } => write!(
                f,
                "failed to generate email with proper <body> structure after {attempts} repair attempts"
            ),
            Self::RecordNotFound { lookup } => write!(f, "no outreach record found for {lookup}"),
            Self::DeliveryFailure { recipient, reason } => {
                write!(f, "delivery to {recipient} failed: {reason}")
            }
        }
    }
}

impl std::error::Error for OutreachError {}

/// Find the first typed outreach failure anywhere in an error chain.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<OutreachError>()
            .map(OutreachError::kind)
    })
}

/// Configuration gaps abort the whole run; everything else is per-contact.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    error_kind(err) == Some(ErrorKind::ConfigurationMissing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn error_kind_survives_added_context() {
        let err: anyhow::Result<()> =
            Err(OutreachError::StructuralValidationFailure { attempts: 3 }.into());
        let err = err.context("generate email for Ada").unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::StructuralValidation));
        assert!(!is_fatal(&err));
    }

    #[test]
    fn only_missing_configuration_is_fatal() {
        let err = anyhow::Error::new(OutreachError::missing_config("SENDGRID_API_KEY"));
        assert!(is_fatal(&err));
        assert!(err.to_string().contains("SENDGRID_API_KEY"));

        let plain = anyhow::anyhow!("socket closed");
        assert_eq!(error_kind(&plain), None);
        assert!(!is_fatal(&plain));
    }
}
