#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Browser chat front end for the medical assistant.
//!
//! Routes:
//! - `GET /` renders the conversation
//! - `POST /` asks a question and re-renders
//! - `GET /clear` drops the conversation
//! - `GET /export` downloads it as plain text
//!
//! Conversations are keyed by the `medrag_session` cookie.

mod error;
mod handlers;
mod render;
mod server;
mod session;

pub use error::WebError;
pub use render::{escape_html, render_page};
pub use server::{AppState, create_router, serve, shutdown_signal};
pub use session::{SESSION_COOKIE, SessionCookie};
