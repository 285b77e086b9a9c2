use axum::{
    http::StatusCode,
    response::{IntoResponse, Response}
};
use anyhow;

use expense_ledger::LedgerError;

#[derive(Debug)]
pub(crate) enum ServerError{
    BadRequest(String),
    InternalError(anyhow::Error)
}

impl ServerError {
    /// Rejected input is the caller's fault; everything else is ours.
    pub(crate) fn from_ledger(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidExpense(msg) => Self::BadRequest(msg),
            other => Self::InternalError(other.into())
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(msg) =>
                (StatusCode::BAD_REQUEST, format!("Bad request: {}", msg)).into_response(),
            Self::InternalError(err) =>
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Internal error: {}", err)).into_response()
        }
    }
}

impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>
{
    fn from(err: E) -> Self {
        Self::InternalError(err.into())
    }
}
