use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use medrag_conversation::ConversationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebError {
    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error("No conversation to export")]
    NothingToExport,
}

impl WebError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Conversation(ConversationError::EmptyQuestion) | Self::NothingToExport => {
                StatusCode::BAD_REQUEST
            }
            Self::Conversation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::NothingToExport => {
                tracing::debug!(%status, "Export requested for empty conversation");
                (status, "No conversation to export").into_response()
            }
            Self::Conversation(err) => {
                tracing::error!(%status, error = %err, "Request failed");
                (status, err.user_message()).into_response()
            }
        }
    }
}
