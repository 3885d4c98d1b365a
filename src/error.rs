use std::fmt::Display;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{debug, error};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while serving a request.
///
/// None of these are transient: retrying the same request against the same
/// data gives the same answer.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced election, candidate, or user does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The voter has already cast a ballot in this election, or a unique
    /// field is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The request itself is malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The caller is authenticated but not allowed to do this.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// The target is not in a state that allows this.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),
    /// No usable identity was presented.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// A broken server-side invariant.
    #[error("Internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] naming the missing thing.
    pub fn not_found(what: impl Display) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Shorthand for an [`Error::Internal`].
    pub fn internal(msg: impl Display) -> Self {
        Self::Internal(msg.to_string())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::NotFound,
            Self::Conflict(_) => Status::Conflict,
            Self::InvalidArgument(_) => Status::BadRequest,
            Self::PermissionDenied(_) => Status::Forbidden,
            Self::FailedPrecondition(_) => Status::PreconditionFailed,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Internal(_) | Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature
                | JwtErrorKind::ImmatureSignature
                | JwtErrorKind::InvalidSignature => Status::Unauthorized,
                _ => Status::InternalServerError,
            },
        }
    }

    /// A stable machine-readable name for the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::FailedPrecondition(_) => "FAILED_PRECONDITION",
            Self::Unauthorized(_) | Self::Jwt(_) => "UNAUTHORIZED",
            Self::Internal(_) | Self::Db(_) => "INTERNAL",
        }
    }
}

/// JSON body sent alongside an error status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let body = if status.code >= 500 {
            // Don't leak database internals to the client.
            error!("{self}");
            ErrorBody {
                error: "INTERNAL".to_string(),
                message: "Internal server error".to_string(),
            }
        } else {
            debug!("{self}");
            ErrorBody {
                error: self.kind().to_string(),
                message: self.to_string(),
            }
        };
        Custom(status, Json(body)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(Error::not_found("Election 1").status(), Status::NotFound);
        assert_eq!(Error::Conflict(String::new()).status(), Status::Conflict);
        assert_eq!(Error::InvalidArgument(String::new()).status(), Status::BadRequest);
        assert_eq!(Error::PermissionDenied(String::new()).status(), Status::Forbidden);
        assert_eq!(
            Error::FailedPrecondition(String::new()).status(),
            Status::PreconditionFailed
        );
        assert_eq!(Error::internal("boom").status(), Status::InternalServerError);
    }
}
