//! Error taxonomy shared by the rate collaborators and the aggregation engine.

use std::fmt::Display;
use thiserror::Error;

/// Known upstream error kinds reported by the quote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAccessKey,
    InactiveAccount,
    NonExistentFunction,
    ExceededRequestAllowance,
    UnsupportedFunction,
    NoResults,
    InvalidSourceCurrency,
    InvalidCurrencyCodes,
    NoDateSpecified,
    InvalidDate,
    InvalidFromProperty,
    InvalidToProperty,
    InvalidAmountProperty,
    NotFound,
    NoTimeFrameSpecified,
    InvalidStartDate,
    InvalidEndDate,
    InvalidTimeFrame,
    ExceededTimeFrameLimit,
    Unknown,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// An upstream numeric status code resolved to a typed, loggable error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} ({code}): {description}")]
pub struct ClassifiedError {
    pub code: i64,
    pub kind: ErrorKind,
    pub description: &'static str,
}

/// Maps an upstream status code to its classified error. Unlisted codes map to
/// `ErrorKind::Unknown`.
pub fn classify(code: i64) -> ClassifiedError {
    let (kind, description) = match code {
        101 => (
            ErrorKind::InvalidAccessKey,
            "User did not supply an access key or supplied an invalid access key.",
        ),
        102 => (
            ErrorKind::InactiveAccount,
            "The user's account is not active. User will be prompted to get in touch with Customer Support.",
        ),
        103 => (
            ErrorKind::NonExistentFunction,
            "User requested a non-existent API function.",
        ),
        104 => (
            ErrorKind::ExceededRequestAllowance,
            "User has reached or exceeded his subscription plan's monthly API request allowance.",
        ),
        105 => (
            ErrorKind::UnsupportedFunction,
            "The user's current subscription plan does not support the requested API function.",
        ),
        106 => (
            ErrorKind::NoResults,
            "The user's query did not return any results.",
        ),
        201 => (
            ErrorKind::InvalidSourceCurrency,
            "User entered an invalid Source Currency.",
        ),
        202 => (
            ErrorKind::InvalidCurrencyCodes,
            "User entered one or more invalid currency codes.",
        ),
        301 => (
            ErrorKind::NoDateSpecified,
            "User did not specify a date. [historical]",
        ),
        302 => (
            ErrorKind::InvalidDate,
            "User entered an invalid date. [historical, convert]",
        ),
        401 => (
            ErrorKind::InvalidFromProperty,
            "User entered an invalid \"from\" property. [convert]",
        ),
        402 => (
            ErrorKind::InvalidToProperty,
            "User entered an invalid \"to\" property. [convert]",
        ),
        403 => (
            ErrorKind::InvalidAmountProperty,
            "User entered no or an invalid \"amount\" property. [convert]",
        ),
        404 => (
            ErrorKind::NotFound,
            "User requested a resource which does not exist.",
        ),
        501 => (
            ErrorKind::NoTimeFrameSpecified,
            "User did not specify a Time-Frame. [timeframe, convert]",
        ),
        502 => (
            ErrorKind::InvalidStartDate,
            "User entered an invalid \"start_date\" property. [timeframe, convert]",
        ),
        503 => (
            ErrorKind::InvalidEndDate,
            "User entered an invalid \"end_date\" property. [timeframe, convert]",
        ),
        504 => (
            ErrorKind::InvalidTimeFrame,
            "User entered an invalid Time-Frame. [timeframe, convert]",
        ),
        505 => (
            ErrorKind::ExceededTimeFrameLimit,
            "The Time-Frame specified by the user is too long - exceeding 365 days. [timeframe]",
        ),
        _ => (ErrorKind::Unknown, "Unknown error occurred."),
    };

    ClassifiedError {
        code,
        kind,
        description,
    }
}

/// Failure of a single collaborator call.
#[derive(Debug, Error)]
pub enum FxError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream error: {0}")]
    Classified(#[from] ClassifiedError),

    #[error("Unexpected response shape: {0}")]
    DataShape(String),
}

impl From<reqwest::Error> for FxError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FxError::Transport(format!("request timed out: {e}"))
        } else if e.is_decode() {
            FxError::DataShape(e.to_string())
        } else {
            FxError::Transport(e.to_string())
        }
    }
}

pub type Result<T, E = FxError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_codes() {
        let err = classify(101);
        assert_eq!(err.kind, ErrorKind::InvalidAccessKey);
        assert_eq!(err.code, 101);

        assert_eq!(classify(104).kind, ErrorKind::ExceededRequestAllowance);
        assert_eq!(classify(202).kind, ErrorKind::InvalidCurrencyCodes);
        assert_eq!(classify(404).kind, ErrorKind::NotFound);
        assert_eq!(classify(505).kind, ErrorKind::ExceededTimeFrameLimit);
    }

    #[test]
    fn test_classify_unknown_code() {
        for code in [0, -1, 200, 999, i64::MAX] {
            let err = classify(code);
            assert_eq!(err.kind, ErrorKind::Unknown);
            assert_eq!(err.code, code);
            assert_eq!(err.description, "Unknown error occurred.");
        }
    }

    #[test]
    fn test_classify_is_deterministic() {
        for code in [101, 106, 302, 503, 777] {
            assert_eq!(classify(code), classify(code));
        }
    }

    #[test]
    fn test_classified_error_display() {
        let err = FxError::from(classify(201));
        assert_eq!(
            err.to_string(),
            "Upstream error: InvalidSourceCurrency (201): User entered an invalid Source Currency."
        );
    }
}
