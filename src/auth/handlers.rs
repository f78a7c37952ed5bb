use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use crate::{
    auth::{
        dto::{
            AuthResponse, FormErrorResponse, LoginRequest, MessageResponse, PublicUser,
            RefreshRequest, ResendQuery, SignUpRequest, SignUpResponse, UnverifiedResponse,
            VerifyEmailQuery,
        },
        repo_types::User,
        services::{
            self, resend_redirect, ResendError, SignInError, SignUpError, SignedIn,
            VerifyEmailError,
        },
        session::AuthSession,
    },
    state::AppState,
};

type JsonError<T> = (StatusCode, Json<T>);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/auth/refresh", post(refresh))
}

pub fn email_routes() -> Router<AppState> {
    Router::new()
        .route("/email/verify", get(verify_email))
        .route("/email/verify/send", post(resend_verification))
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            email_verified: user.is_verified(),
        }
    }
}

fn session_response(signed: SignedIn) -> Json<AuthResponse> {
    let user = PublicUser::from(&signed.user);
    Json(AuthResponse {
        access_token: signed.session.access_token,
        refresh_token: signed.session.refresh_token,
        user,
    })
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), JsonError<FormErrorResponse>> {
    match services::sign_up(&state, &payload).await {
        Ok(done) => Ok((
            StatusCode::CREATED,
            Json(SignUpResponse {
                user: PublicUser::from(&done.user),
                redirect: done.redirect.to_string(),
            }),
        )),
        Err(e) => {
            let status = match &e {
                SignUpError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SignUpError::EmailTaken => StatusCode::CONFLICT,
                SignUpError::Store(_) | SignUpError::Notification(_) | SignUpError::Internal(_) => {
                    error!(error = %e, "sign-up failed");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            Err((
                status,
                Json(FormErrorResponse {
                    errors: e.field_errors(),
                }),
            ))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, Response> {
    let e = match services::sign_in(&state, &payload.email, &payload.password).await {
        Ok(signed) => return Ok(session_response(signed)),
        Err(e) => e,
    };

    let message = e.message();
    Err(match e {
        SignInError::EmailUnverified { email } => {
            let redirect = resend_redirect(&state.config.app_base_url, &email, false);
            (
                StatusCode::FORBIDDEN,
                Json(UnverifiedResponse {
                    error: "EMAIL_NOT_VERIFIED",
                    message,
                    email,
                    redirect: redirect.to_string(),
                }),
            )
                .into_response()
        }
        SignInError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, Json(MessageResponse::new(message))).into_response()
        }
        other => {
            error!(error = %other, "login failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse::new(message)),
            )
                .into_response()
        }
    })
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, JsonError<MessageResponse>> {
    let signed = services::refresh(&state, &payload.refresh_token)
        .await
        .map_err(|e| match e {
            SignInError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(MessageResponse::new("Invalid or expired token")),
            ),
            other => {
                error!(error = %other, "refresh failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(MessageResponse::new(other.message())),
                )
            }
        })?;
    Ok(session_response(signed))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<StatusCode, (StatusCode, String)> {
    services::sign_out(&state, session).await.map_err(|e| {
        error!(error = %e, "sign-out failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            services::SOMETHING_WENT_WRONG.to_string(),
        )
    })?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, query))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<MessageResponse>, JsonError<MessageResponse>> {
    match services::verify_email(&state, query.email.as_deref(), query.token.as_deref()).await {
        Ok(message) => Ok(Json(MessageResponse::new(message))),
        Err(e @ (VerifyEmailError::MissingFields | VerifyEmailError::InvalidToken)) => Err((
            StatusCode::BAD_REQUEST,
            Json(MessageResponse::new(e.to_string())),
        )),
        Err(e) => {
            error!(error = %e, "email verification failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse::new("Error verifying your email")),
            ))
        }
    }
}

#[instrument(skip(state, query))]
pub async fn resend_verification(
    State(state): State<AppState>,
    Query(query): Query<ResendQuery>,
) -> Result<Json<MessageResponse>, JsonError<MessageResponse>> {
    match services::resend_verification(&state, query.email.as_deref()).await {
        Ok(outcome) => Ok(Json(MessageResponse::with_redirect(
            outcome.message,
            outcome.redirect.to_string(),
        ))),
        Err(e) => {
            let status = match &e {
                ResendError::MissingEmail => StatusCode::BAD_REQUEST,
                ResendError::UnknownAccount => StatusCode::NOT_FOUND,
                ResendError::AlreadyVerified => StatusCode::CONFLICT,
                ResendError::Notification(_) | ResendError::Store(_) => {
                    error!(error = %e, "resend verification failed");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            let message = match &e {
                ResendError::Store(_) => services::SOMETHING_WENT_WRONG.to_string(),
                other => other.to_string(),
            };
            Err((status, Json(MessageResponse::new(message))))
        }
    }
}
