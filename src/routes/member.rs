use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::{error, instrument};

use crate::{
    auth::{services, session::AuthSession},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
}

pub fn member_routes() -> Router<AppState> {
    Router::new().route("/member", get(member_area))
}

#[instrument(skip(state))]
pub async fn member_area(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<MemberResponse>, (StatusCode, String)> {
    let user = services::current_user(&state, session.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %session.user_id, "user lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                services::SOMETHING_WENT_WRONG.to_string(),
            )
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(MemberResponse {
        id: user.id,
        message: format!("Signed in as {}", user.email),
        name: user.name,
        email: user.email,
    }))
}
