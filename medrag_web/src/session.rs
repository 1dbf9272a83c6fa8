use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::response::{IntoResponseParts, ResponseParts};
use std::convert::Infallible;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "medrag_session";

/// Conversation id carried in the session cookie.
///
/// A request without a valid cookie gets a fresh id, and the cookie is set
/// when the extractor is returned as part of the response.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookie {
    pub id: Uuid,
    pub is_new: bool,
}

impl SessionCookie {
    fn from_header(value: &str) -> Option<Uuid> {
        value
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, id)| Uuid::parse_str(id.trim()).ok())
    }

    #[must_use]
    pub fn set_cookie_value(&self) -> String {
        format!("{SESSION_COOKIE}={}; HttpOnly; SameSite=Lax; Path=/", self.id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionCookie {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let existing = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(Self::from_header);

        Ok(existing.map_or_else(
            || Self {
                id: Uuid::now_v7(),
                is_new: true,
            },
            |id| Self { id, is_new: false },
        ))
    }
}

impl IntoResponseParts for SessionCookie {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if !self.is_new {
            return Ok(res);
        }
        if let Ok(value) = HeaderValue::from_str(&self.set_cookie_value()) {
            res.headers_mut().insert(SET_COOKIE, value);
        }
        Ok(res)
    }
}
