use axum::Form;
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{Html, IntoResponse, Redirect, Response};
use medrag_conversation::ConversationError;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::WebError;
use crate::render::render_page;
use crate::server::AppState;
use crate::session::SessionCookie;

const EXPORT_FILENAME: &str = "medical_conversation.txt";

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub prompt: String,
}

pub async fn index(
    State(state): State<AppState>,
    session: SessionCookie,
) -> Result<impl IntoResponse, WebError> {
    let messages = state.orchestrator.history(&session.id).await?;
    Ok((session, Html(render_page(&messages, None, None))))
}

/// Answer the submitted prompt.
///
/// Success redirects back to the chat page unless sources are shown, in
/// which case the page is rendered directly with the source list. Failures
/// re-render the page with the error banner.
pub async fn ask(
    State(state): State<AppState>,
    session: SessionCookie,
    Form(form): Form<AskForm>,
) -> Result<Response, WebError> {
    let (error, sources) = match state.orchestrator.ask(&session.id, &form.prompt).await {
        Ok(outcome) => {
            info!(
                session = %session.id,
                turn = outcome.turn_number,
                memory = %outcome.memory_kind,
                "Answered question"
            );
            let Some(sources) = outcome.sources else {
                return Ok((session, Redirect::to("/")).into_response());
            };
            (None, Some(sources))
        }
        Err(ConversationError::EmptyQuestion) => {
            return Ok((session, Redirect::to("/")).into_response());
        }
        Err(e) => {
            error!(session = %session.id, error = %e, "Failed to answer question");
            (Some(e.user_message()), None)
        }
    };

    let messages = state.orchestrator.history(&session.id).await?;
    Ok((
        session,
        Html(render_page(&messages, error, sources.as_deref())),
    )
        .into_response())
}

pub async fn clear(
    State(state): State<AppState>,
    session: SessionCookie,
) -> Result<impl IntoResponse, WebError> {
    state.orchestrator.clear(&session.id).await?;
    Ok((session, Redirect::to("/")))
}

pub async fn export(
    State(state): State<AppState>,
    session: SessionCookie,
) -> Result<impl IntoResponse, WebError> {
    let transcript = state
        .orchestrator
        .export(&session.id)
        .await?
        .ok_or(WebError::NothingToExport)?;

    Ok((
        session,
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename={EXPORT_FILENAME}"),
            ),
        ],
        transcript,
    ))
}

pub async fn health() -> &'static str {
    "ok"
}
