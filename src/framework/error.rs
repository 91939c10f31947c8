//! # Record Errors
//!
//! Two families of failure flow through the framework and they are never mixed:
//!
//! - **Validation failures** (local rules or remote rejections) are recoverable.
//!   They land in a record's [`Errors`] and non-strict operations report them via
//!   their boolean result. Only the `_strict` variants turn them into
//!   [`RecordInvalid`].
//! - **Infrastructure failures** ([`ApiError`]: not found, auth, transport faults)
//!   always propagate to the caller unmodified and are never written into
//!   [`Errors`].

use std::fmt::{self, Debug, Display};
use thiserror::Error;

/// Broad category of an infrastructure failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    NotFound,
    Authentication,
    Authorization,
    Conflict,
    Transport,
    Unexpected,
}

/// Infrastructure-level failure reported by the remote service.
///
/// `Display` shows only the message; `Debug` shows the code as well.
#[derive(Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
    code: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Unexpected,
            message: message.into(),
            code: Some(code.into()),
        }
    }

    pub fn with_kind(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub fn not_found(kind: &str, id: &str) -> Self {
        Self::with_kind(ApiErrorKind::NotFound, format!("{kind} not found: {id}"))
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::with_kind(ApiErrorKind::Transport, message)
    }

    pub fn code_as(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }
}

impl Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ApiError ({}) {}",
            self.code.as_deref().unwrap_or("-"),
            self.message
        )
    }
}

/// One field-scoped validation message, local or remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    /// Remote error code; `None` for local validation.
    pub code: Option<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Ordered set of validation messages attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    entries: Vec<FieldError>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.entries.push(FieldError::new(field, message));
    }

    pub fn push(&mut self, error: FieldError) {
        self.entries.push(error);
    }

    /// Messages recorded for `field`, in insertion order.
    pub fn on(&self, field: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn has(&self, field: &str) -> bool {
        self.entries.iter().any(|e| e.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}

impl Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_messages().join(", "))
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<FieldError> for Errors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Raised by strict operations when a record fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} is invalid: {errors}")]
pub struct RecordInvalid {
    pub kind: &'static str,
    pub id: Option<String>,
    pub errors: Errors,
}

/// Raised when anything tries to change a destroyed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("can't modify destroyed {kind} {}", .id.as_deref().unwrap_or("(new)"))]
pub struct ImmutableRecordError {
    pub kind: &'static str,
    pub id: Option<String>,
}

/// Failure reported by a [`Transport`](crate::framework::Transport) call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The remote side rejected a create/update payload.
    #[error("remote validation failed: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Validation(Vec<FieldError>),
}

/// Every error a record, association or collection operation can return.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Invalid(#[from] RecordInvalid),

    #[error(transparent)]
    Immutable(#[from] ImmutableRecordError),

    #[error("unknown attribute `{name}` for {kind}")]
    UnknownAttribute { kind: &'static str, name: String },

    /// A value could not be turned into a record (e.g. a boolean foreign key).
    #[error("cannot build {kind} from a {found} value")]
    MalformedInput { kind: &'static str, found: &'static str },
}

impl RecordError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RecordError::Api(e) if e.is_not_found())
    }
}

pub type RecordResult<T> = Result<T, RecordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_shows_only_message() {
        let err = ApiError::new("error_message", "error code");
        assert_eq!(err.to_string(), "error_message");
    }

    #[test]
    fn api_error_debug_shows_code_and_message() {
        let err = ApiError::new("error_message", "error code");
        assert_eq!(format!("{err:?}"), "ApiError (error code) error_message");
    }

    #[test]
    fn api_error_emptiness_delegates_to_message() {
        for message in ["", "abc"] {
            assert_eq!(ApiError::new(message, "error code").is_empty(), message.is_empty());
        }
    }

    #[test]
    fn not_found_is_classified() {
        let err = ApiError::not_found("customer", "cust_1");
        assert!(err.is_not_found());
        assert!(RecordError::from(err).is_not_found());
    }

    #[test]
    fn errors_are_field_scoped_and_ordered() {
        let mut errors = Errors::new();
        errors.add("cvv", "is invalid");
        errors.push(FieldError::with_code("number", "is invalid", "81715"));
        errors.add("cvv", "is too short");

        assert_eq!(errors.on("cvv"), vec!["is invalid", "is too short"]);
        assert!(errors.has("number"));
        assert!(!errors.has("expiration_date"));
        assert_eq!(errors.to_string(), "cvv is invalid, number is invalid, cvv is too short");
    }

    #[test]
    fn record_invalid_lists_every_message() {
        let err = RecordInvalid {
            kind: "credit_card",
            id: None,
            errors: [FieldError::new("cvv", "is invalid")].into_iter().collect(),
        };
        assert_eq!(err.to_string(), "credit_card is invalid: cvv is invalid");
    }
}
