//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors are modeled as a tree: `Error` is the root holding an
/// `error_kind` enum describing what went wrong plus the original lower
/// layer error (if any) in `source`. Lower-layer errors are translated at
/// the boundary so callers of this crate never depend on `entity_api` or
/// `reqwest` error types directly. Every kind maps to a stable
/// machine-readable code via [`Error::code`], which upper layers can hand
/// to clients unchanged.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    /// Input that never reaches storage (e.g. a malformed slot interval)
    Validation(ValidationErrorKind),
    /// The operation contradicts current state (overlap, already booked)
    Conflict(ConflictKind),
    NotFound(ResourceKind),
    /// The acting freelancer does not own the resource
    PermissionDenied(ResourceKind),
    /// A booking status change outside the legal state machine edges
    IllegalTransition(TransitionErrorKind),
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResourceKind {
    Freelancer,
    Slot,
    Booking,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConflictKind {
    /// The slot interval overlaps another slot of the same freelancer
    SlotOverlap,
    /// The slot already carries a confirmed booking
    SlotAlreadyBooked,
    /// Signup with an email another freelancer already uses
    EmailTaken,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ValidationErrorKind {
    SlotInterval,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionErrorKind {
    /// The requested status equals the current one
    NoChanges,
    /// The edge is not part of the state machine, or the current status is terminal
    OperationNotAllowed,
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    /// Persistence failure; the enclosing transaction was rolled back
    Storage,
    Config,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    /// The provider answered with a non-success status
    Provider(String),
    Other(String),
}

impl Error {
    /// Stable machine-readable code for this error, suitable for clients.
    pub fn code(&self) -> &'static str {
        match &self.error_kind {
            DomainErrorKind::Validation(ValidationErrorKind::SlotInterval) => "timeslot.invalid",
            DomainErrorKind::Conflict(ConflictKind::SlotOverlap) => "timeslot.conflict",
            DomainErrorKind::Conflict(ConflictKind::SlotAlreadyBooked) => "slot.already_booked",
            DomainErrorKind::Conflict(ConflictKind::EmailTaken) => "freelancer.already_exists",
            DomainErrorKind::NotFound(ResourceKind::Freelancer) => "freelancer.not_found",
            DomainErrorKind::NotFound(ResourceKind::Slot) => "slot.not_found",
            DomainErrorKind::NotFound(ResourceKind::Booking) => "booking.not_found",
            DomainErrorKind::PermissionDenied(ResourceKind::Freelancer) => {
                "freelancer.permission_denied"
            }
            DomainErrorKind::PermissionDenied(ResourceKind::Slot) => "slot.permission_denied",
            DomainErrorKind::PermissionDenied(ResourceKind::Booking) => "booking.permission_denied",
            DomainErrorKind::IllegalTransition(TransitionErrorKind::NoChanges) => {
                "booking.no_changes"
            }
            DomainErrorKind::IllegalTransition(TransitionErrorKind::OperationNotAllowed) => {
                "booking.operation_not_allowed"
            }
            DomainErrorKind::Internal(InternalErrorKind::Storage) => "storage.error",
            DomainErrorKind::Internal(InternalErrorKind::Config) => "config.error",
            DomainErrorKind::Internal(InternalErrorKind::Other(_)) => "internal.error",
            DomainErrorKind::External(_) => "integration.error",
        }
    }

    /// Translates an `entity_api` error, attaching which resource the
    /// failed operation was about so not-found surfaces with the right code.
    pub(crate) fn from_entity(err: EntityApiError, resource: ResourceKind) -> Self {
        match err.error_kind {
            EntityApiErrorKind::RecordNotFound => Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::NotFound(resource),
            },
            _ => Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Storage),
            },
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.error_kind)
    }
}

impl fmt::Display for DomainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DomainErrorKind::Validation(ValidationErrorKind::SlotInterval) => {
                write!(f, "slot must end after it starts and meet the minimum length")
            }
            DomainErrorKind::Conflict(ConflictKind::SlotOverlap) => {
                write!(f, "slot overlaps an existing slot")
            }
            DomainErrorKind::Conflict(ConflictKind::SlotAlreadyBooked) => {
                write!(f, "slot is already booked")
            }
            DomainErrorKind::Conflict(ConflictKind::EmailTaken) => {
                write!(f, "a freelancer with this email already exists")
            }
            DomainErrorKind::NotFound(resource) => write!(f, "{resource:?} not found"),
            DomainErrorKind::PermissionDenied(resource) => {
                write!(f, "no permission to modify this {resource:?}")
            }
            DomainErrorKind::IllegalTransition(TransitionErrorKind::NoChanges) => {
                write!(f, "no changes detected in booking status")
            }
            DomainErrorKind::IllegalTransition(TransitionErrorKind::OperationNotAllowed) => {
                write!(f, "this status change is not allowed")
            }
            DomainErrorKind::Internal(kind) => write!(f, "internal error: {kind:?}"),
            DomainErrorKind::External(kind) => write!(f, "integration error: {kind:?}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer
// when no resource context is available at the call site.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => {
                DomainErrorKind::Internal(InternalErrorKind::Other("record not found".to_string()))
            }
            _ => DomainErrorKind::Internal(InternalErrorKind::Storage),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let cases = [
            (
                DomainErrorKind::Validation(ValidationErrorKind::SlotInterval),
                "timeslot.invalid",
            ),
            (
                DomainErrorKind::Conflict(ConflictKind::SlotOverlap),
                "timeslot.conflict",
            ),
            (
                DomainErrorKind::Conflict(ConflictKind::SlotAlreadyBooked),
                "slot.already_booked",
            ),
            (
                DomainErrorKind::NotFound(ResourceKind::Slot),
                "slot.not_found",
            ),
            (
                DomainErrorKind::NotFound(ResourceKind::Freelancer),
                "freelancer.not_found",
            ),
            (
                DomainErrorKind::PermissionDenied(ResourceKind::Booking),
                "booking.permission_denied",
            ),
            (
                DomainErrorKind::IllegalTransition(TransitionErrorKind::NoChanges),
                "booking.no_changes",
            ),
            (
                DomainErrorKind::IllegalTransition(TransitionErrorKind::OperationNotAllowed),
                "booking.operation_not_allowed",
            ),
            (
                DomainErrorKind::Internal(InternalErrorKind::Storage),
                "storage.error",
            ),
        ];

        for (kind, code) in cases {
            let error = Error {
                source: None,
                error_kind: kind,
            };
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn entity_not_found_translates_with_resource_context() {
        let entity_err = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        };

        let error = Error::from_entity(entity_err, ResourceKind::Booking);

        assert_eq!(
            error.error_kind,
            DomainErrorKind::NotFound(ResourceKind::Booking)
        );
        assert_eq!(error.code(), "booking.not_found");
    }
}
