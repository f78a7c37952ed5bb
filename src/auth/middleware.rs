use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::extractors::bearer_token;
use crate::config::Access;
use crate::state::AppState;

/// Gate every request through `AuthConfig::authorized`.
/// A resolved session is stored in the request extensions for the `AuthSession` extractor.
pub async fn authorize(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let session = match bearer_token(req.headers()) {
        Some(token) => state.sessions.authenticate(token).await.ok(),
        None => None,
    };
    let path = req.uri().path().to_string();

    match state.sessions.config().authorized(session.is_some(), &path) {
        Access::Allow => {
            if let Some(session) = session {
                req.extensions_mut().insert(session);
            }
            next.run(req).await
        }
        Access::SignIn => {
            debug!(%path, "no session, redirecting to sign-in");
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("callbackUrl", &path)
                .finish();
            let target = format!("{}?{}", state.sessions.config().sign_in_path, query);
            Redirect::to(&target).into_response()
        }
        Access::Redirect(target) => {
            debug!(%path, %target, "already signed in");
            Redirect::to(&target).into_response()
        }
    }
}
