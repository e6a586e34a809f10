//! Response status mapping.

use std::fmt;

/// Outcome of a response as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    /// The engine answered 200, 201 or 202.
    Success,
    /// The engine answered 404.
    NotExists,
    /// Any other status code, or the decode cycle failed.
    Failure,
    /// Rows are still streaming; the final status is not known yet.
    Chunked,
}

impl ResponseStatus {
    /// Map an HTTP status code to its final outcome.
    ///
    /// Never returns [`ResponseStatus::Chunked`]; that value is only reported
    /// by a response whose rows are still being decoded.
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            200..=202 => Self::Success,
            404 => Self::NotExists,
            _ => Self::Failure,
        }
    }

    /// Whether this is [`ResponseStatus::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether the status is final.
    #[must_use]
    pub fn is_final(self) -> bool {
        !matches!(self, Self::Chunked)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::NotExists => write!(f, "NOT_EXISTS"),
            Self::Failure => write!(f, "FAILURE"),
            Self::Chunked => write!(f, "CHUNKED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes() {
        for code in [200, 201, 202] {
            assert_eq!(ResponseStatus::from_code(code), ResponseStatus::Success);
        }
    }

    #[test]
    fn test_not_exists() {
        assert_eq!(ResponseStatus::from_code(404), ResponseStatus::NotExists);
    }

    #[test]
    fn test_everything_else_fails() {
        for code in [0, 100, 203, 204, 301, 400, 401, 403, 405, 500, 503, u16::MAX] {
            assert_eq!(
                ResponseStatus::from_code(code),
                ResponseStatus::Failure,
                "code {code}"
            );
        }
    }

    #[test]
    fn test_status_predicates() {
        assert!(ResponseStatus::Success.is_success());
        assert!(!ResponseStatus::Chunked.is_final());
        assert!(ResponseStatus::NotExists.is_final());
        assert_eq!(ResponseStatus::Chunked.to_string(), "CHUNKED");
    }
}
