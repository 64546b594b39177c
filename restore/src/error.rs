use std::error;
use std::fmt;

/// Result type of the restore collaborators, using [`RestoreError`] as the error type.
pub type RestoreResult<T> = Result<T, RestoreError>;

/// Error reported by transports, appenders and the wire codec.
///
/// A [`RestoreError`] is either a single error made of an [`ErrorKind`], a static
/// description and an optional dynamic detail, or a list of aggregated errors.
/// The replication driver wraps it into a [`crate::replication::replicator::ReplicationError`]
/// together with the context of the failing step.
#[derive(Debug, Clone)]
pub struct RestoreError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    Many(Vec<RestoreError>),
}

/// Categories of failures that collaborators of the replication driver report.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Transport Errors
    TransportFailed,
    RequestTimeout,

    // Serialization Errors
    SerializationError,
    DeserializationError,

    // Storage Errors
    IoError,

    // State Errors
    InvalidState,

    // Unknown / Uncategorized
    Unknown,

    // Raised by fault injection in tests.
    #[cfg(feature = "failpoints")]
    FailpointTriggered,
}

impl RestoreError {
    /// Creates a [`RestoreError`] aggregating multiple errors.
    pub fn many(errors: Vec<RestoreError>) -> RestoreError {
        RestoreError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors this is the kind of the first one, or [`ErrorKind::Unknown`]
    /// when there are none.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns every [`ErrorKind`] contained in this error, flattening aggregates.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => vec![kind],
            ErrorRepr::Many(ref errors) => errors.iter().flat_map(|err| err.kinds()).collect(),
        }
    }

    /// Returns the dynamic detail of this error, or of the first aggregated error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|e| e.detail()),
            ErrorRepr::WithDescription(..) => None,
        }
    }
}

impl PartialEq for RestoreError {
    fn eq(&self, other: &RestoreError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::WithDescription(kind_a, _), ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Many(errors_a), ErrorRepr::Many(errors_b)) => errors_a == errors_b,
            _ => false,
        }
    }
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => write!(f, "{kind:?}: {desc}"),
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                write!(f, "{kind:?}: {desc} -> {detail}")
            }
            ErrorRepr::Many(ref errors) => match errors.as_slice() {
                [] => f.write_str("Multiple errors occurred (empty)"),
                [error] => fmt::Display::fmt(error, f),
                errors => {
                    write!(f, "Multiple errors occurred ({} total):", errors.len())?;
                    for (i, error) in errors.iter().enumerate() {
                        write!(f, "\n  {}: {}", i + 1, error)?;
                    }
                    Ok(())
                }
            },
        }
    }
}

impl error::Error for RestoreError {}

impl From<(ErrorKind, &'static str)> for RestoreError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> RestoreError {
        RestoreError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for RestoreError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> RestoreError {
        RestoreError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

impl<E> From<Vec<E>> for RestoreError
where
    E: Into<RestoreError>,
{
    fn from(errors: Vec<E>) -> RestoreError {
        RestoreError::many(errors.into_iter().map(Into::into).collect())
    }
}

/// Converts [`std::io::Error`] into [`ErrorKind::IoError`], except for timeouts which
/// map to [`ErrorKind::RequestTimeout`].
impl From<std::io::Error> for RestoreError {
    fn from(err: std::io::Error) -> RestoreError {
        let (kind, description) = match err.kind() {
            std::io::ErrorKind::TimedOut => (ErrorKind::RequestTimeout, "I/O operation timed out"),
            _ => (ErrorKind::IoError, "I/O error occurred"),
        };

        RestoreError::from((kind, description, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bail, restore_error};

    #[test]
    fn simple_error_has_no_detail() {
        let err = RestoreError::from((ErrorKind::TransportFailed, "Connection refused"));

        assert_eq!(err.kind(), ErrorKind::TransportFailed);
        assert_eq!(err.detail(), None);
        assert_eq!(err.kinds(), vec![ErrorKind::TransportFailed]);
    }

    #[test]
    fn aggregated_errors_flatten_kinds_and_find_detail() {
        let inner = RestoreError::many(vec![
            restore_error!(ErrorKind::DeserializationError, "Invalid chunk"),
            restore_error!(ErrorKind::IoError, "Disk error", "no space left on device"),
        ]);
        let outer = RestoreError::from(vec![
            inner,
            restore_error!(ErrorKind::TransportFailed, "Connection reset"),
        ]);

        assert_eq!(outer.kind(), ErrorKind::DeserializationError);
        assert_eq!(
            outer.kinds(),
            vec![
                ErrorKind::DeserializationError,
                ErrorKind::IoError,
                ErrorKind::TransportFailed
            ]
        );
        assert_eq!(outer.detail(), Some("no space left on device"));
    }

    #[test]
    fn empty_aggregate_is_unknown() {
        let err = RestoreError::many(vec![]);

        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.kinds().is_empty());
        assert_eq!(err.to_string(), "Multiple errors occurred (empty)");
    }

    #[test]
    fn errors_compare_by_kind() {
        let a = restore_error!(ErrorKind::TransportFailed, "a");
        let b = restore_error!(ErrorKind::TransportFailed, "b");
        let c = restore_error!(ErrorKind::RequestTimeout, "a");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_includes_kind_description_and_detail() {
        let err = restore_error!(ErrorKind::TransportFailed, "Member rejected request", "not leader");

        assert_eq!(
            err.to_string(),
            "TransportFailed: Member rejected request -> not leader"
        );

        let many = RestoreError::many(vec![
            restore_error!(ErrorKind::IoError, "first"),
            restore_error!(ErrorKind::Unknown, "second"),
        ]);
        let display = many.to_string();
        assert!(display.contains("2 total"));
        assert!(display.contains("1: IoError: first"));
    }

    #[test]
    fn io_timeouts_are_request_timeouts() {
        let err = RestoreError::from(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "deadline elapsed",
        ));
        assert_eq!(err.kind(), ErrorKind::RequestTimeout);

        let err = RestoreError::from(std::io::Error::other("broken pipe"));
        assert_eq!(err.kind(), ErrorKind::IoError);
        assert_eq!(err.detail(), Some("broken pipe"));
    }

    #[test]
    fn bail_returns_early() {
        fn check(position: i64) -> RestoreResult<i64> {
            if position < 0 {
                bail!(ErrorKind::InvalidState, "Negative position", position);
            }
            Ok(position)
        }

        assert_eq!(check(3), Ok(3));
        let err = check(-1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.detail(), Some("-1"));
    }
}
