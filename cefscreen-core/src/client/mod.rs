//! Query client trait and structured error types.
//!
//! The `QueryClient` trait abstracts over the execution backend (the hosted
//! query service over HTTP, or the in-process engine) so the pipeline can swap
//! implementations and tests can script failures.

pub mod http;

use crate::frame::FieldFrame;
use crate::request::Request;
use thiserror::Error;

pub use http::HttpQueryClient;

/// Errors from executing a request.
///
/// These are designed to be displayable in both CLI and TUI contexts.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The call itself failed: transport error, non-success status, or the
    /// service reported an error for the query.
    #[error("remote call failed: {0}")]
    Remote(String),

    /// The service answered, but not in the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The local engine could not evaluate the expression tree.
    #[error("evaluation error: {0}")]
    Evaluation(String),
}

/// Executes requests: one result frame per requested field, in request order.
pub trait QueryClient: Send + Sync {
    /// Human-readable name of this backend.
    fn name(&self) -> &str;

    /// Evaluate `request`; blocks until the backend answers.
    fn execute(&self, request: &Request) -> Result<Vec<FieldFrame>, ClientError>;
}

impl<C: QueryClient + ?Sized> QueryClient for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&self, request: &Request) -> Result<Vec<FieldFrame>, ClientError> {
        (**self).execute(request)
    }
}

/// Check that `frames` answers `request`: same count, same names, same order.
pub fn check_shape(request: &Request, frames: &[FieldFrame]) -> Result<(), ClientError> {
    if frames.len() != request.fields.len() {
        return Err(ClientError::MalformedResponse(format!(
            "expected {} result frames, got {}",
            request.fields.len(),
            frames.len()
        )));
    }
    for (field, frame) in request.fields.iter().zip(frames) {
        if field.name != frame.field {
            return Err(ClientError::MalformedResponse(format!(
                "expected result for '{}', got '{}'",
                field.name, frame.field
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{DataItem, Expr};
    use crate::predicate::Universe;
    use crate::request::NamedField;

    fn request() -> Request {
        Request::new(
            Universe::active_primary_funds(),
            vec![
                NamedField::new("price", Expr::item(DataItem::PxLast)),
                NamedField::new("name", Expr::item(DataItem::Name)),
            ],
        )
    }

    #[test]
    fn shape_check_accepts_matching_frames() {
        let frames = vec![FieldFrame::new("price"), FieldFrame::new("name")];
        assert!(check_shape(&request(), &frames).is_ok());
    }

    #[test]
    fn shape_check_rejects_count_and_order() {
        let short = vec![FieldFrame::new("price")];
        assert!(matches!(
            check_shape(&request(), &short),
            Err(ClientError::MalformedResponse(_))
        ));

        let swapped = vec![FieldFrame::new("name"), FieldFrame::new("price")];
        let err = check_shape(&request(), &swapped).unwrap_err();
        assert!(err.to_string().contains("expected result for 'price'"));
    }
}
