use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::{
    dto::SignUpRequest,
    password::{hash_password, verify_dummy, verify_password},
    repo::StoreError,
    repo_types::{NewUser, User},
    session::{AuthSession, Session, SessionError},
    token::{generate_verification_token, token_matches},
    validation::{normalize_email, validate_sign_up, FieldErrors},
};
use crate::config::Provider;
use crate::mail::{verification_email, verification_link, MailError};
use crate::state::AppState;

pub const EMAIL_TAKEN: &str = "Email already exists";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong.";
pub const EMAIL_VERIFIED: &str = "Email verified successfully. Please relogin.";
pub const VERIFICATION_SENT: &str = "A verification link has been sent to your email.";

#[derive(Debug, Error)]
pub enum SignUpError {
    #[error("sign-up form is invalid")]
    Invalid(FieldErrors),
    #[error("email already exists")]
    EmailTaken,
    #[error("could not create user: {0}")]
    Store(#[source] StoreError),
    #[error("could not send verification email: {0}")]
    Notification(#[source] MailError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SignUpError {
    /// Errors in the shape the sign-up form renders them.
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            SignUpError::Invalid(errors) => errors.clone(),
            SignUpError::EmailTaken => FieldErrors::single("email", EMAIL_TAKEN),
            SignUpError::Store(_) | SignUpError::Notification(_) | SignUpError::Internal(_) => {
                FieldErrors::form("Something went wrong")
            }
        }
    }
}

#[derive(Debug)]
pub struct SignedUp {
    pub user: User,
    pub redirect: Url,
}

#[derive(Debug)]
pub struct SignedIn {
    pub user: User,
    pub session: Session,
}

#[derive(Debug, Error)]
pub enum SignInError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email {email} is not verified")]
    EmailUnverified { email: String },
    #[error("session could not be established: {0}")]
    Failed(#[source] SessionError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SignInError {
    pub fn message(&self) -> String {
        match self {
            SignInError::InvalidCredentials => INVALID_CREDENTIALS.into(),
            SignInError::EmailUnverified { email } => format!("EMAIL_NOT_VERIFIED:{email}"),
            SignInError::Failed(_) | SignInError::Internal(_) => SOMETHING_WENT_WRONG.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum VerifyEmailError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Invalid verification token")]
    InvalidToken,
    #[error("could not verify email: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ResendError {
    #[error("Missing email address")]
    MissingEmail,
    #[error("No account found for this email")]
    UnknownAccount,
    #[error("Email is already verified")]
    AlreadyVerified,
    #[error("Failed to send verification email")]
    Notification(#[source] MailError),
    #[error("could not issue a new token: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct ResendOutcome {
    pub message: &'static str,
    pub redirect: Url,
}

/// `<base>/email/verify/send?email=<address>&verification_sent=<0|1>`
pub fn resend_redirect(base: &Url, email: &str, verification_sent: bool) -> Url {
    let mut url = base
        .join("/email/verify/send")
        .unwrap_or_else(|_| base.clone());
    url.query_pairs_mut()
        .clear()
        .append_pair("email", email)
        .append_pair("verification_sent", if verification_sent { "1" } else { "0" });
    url
}

async fn send_verification_email(
    state: &AppState,
    email: &str,
    token: &str,
) -> Result<(), MailError> {
    let link = verification_link(&state.config.app_base_url, email, token);
    state
        .mailer
        .send(verification_email(email, &link))
        .await
        .map_err(|e| {
            error!(error = %e, email, "failed to send verification email");
            e
        })
}

pub async fn sign_up(state: &AppState, req: &SignUpRequest) -> Result<SignedUp, SignUpError> {
    let input = validate_sign_up(req).map_err(|errors| {
        warn!(fields = ?errors, "sign-up validation failed");
        SignUpError::Invalid(errors)
    })?;

    // Advisory only; the unique constraint on users.email is what holds under races.
    if state
        .users
        .find_by_email(&input.email)
        .await
        .map_err(SignUpError::Store)?
        .is_some()
    {
        warn!(email = %input.email, "email already registered");
        return Err(SignUpError::EmailTaken);
    }

    let hash = hash_password(&input.password)?;
    let token = generate_verification_token();

    let user = state
        .users
        .create(NewUser {
            name: &input.name,
            email: &input.email,
            password_hash: &hash,
            email_verif_token: &token,
        })
        .await
        .map_err(|e| match e {
            StoreError::EmailTaken => {
                warn!(email = %input.email, "email registered concurrently");
                SignUpError::EmailTaken
            }
            other => {
                error!(error = %other, "create user failed");
                SignUpError::Store(other)
            }
        })?;

    send_verification_email(state, &user.email, &token)
        .await
        .map_err(SignUpError::Notification)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    let redirect = resend_redirect(&state.config.app_base_url, &user.email, true);
    Ok(SignedUp { user, redirect })
}

pub async fn sign_in(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<SignedIn, SignInError> {
    let email = normalize_email(email);

    let user = match state.users.find_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            verify_dummy(password);
            warn!(email = %email, "login unknown email");
            return Err(SignInError::InvalidCredentials);
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(SignInError::Internal(e.into()));
        }
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(SignInError::InvalidCredentials);
    }

    if !user.is_verified() {
        info!(user_id = %user.id, "login refused, email not verified");
        return Err(SignInError::EmailUnverified { email: user.email });
    }

    match state
        .sessions
        .sign_in(Provider::Credentials.as_str(), &user)
        .await
    {
        Ok(session) => {
            info!(
                user_id = %user.id,
                session_id = %session.session_id,
                email = %user.email,
                "user logged in"
            );
            Ok(SignedIn { user, session })
        }
        Err(SessionError::InvalidCredentials) => Err(SignInError::InvalidCredentials),
        Err(e) => {
            error!(error = %e, user_id = %user.id, "session sign-in failed");
            Err(SignInError::Failed(e))
        }
    }
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<SignedIn, SignInError> {
    let session = state
        .sessions
        .refresh(refresh_token)
        .await
        .map_err(|e| match e {
            SessionError::InvalidCredentials => SignInError::InvalidCredentials,
            other => SignInError::Failed(other),
        })?;
    let user = state
        .users
        .find_by_id(session.user_id)
        .await
        .map_err(anyhow::Error::from)?
        .ok_or(SignInError::InvalidCredentials)?;
    debug!(user_id = %user.id, session_id = %session.session_id, "tokens refreshed");
    Ok(SignedIn { user, session })
}

pub async fn sign_out(state: &AppState, session: AuthSession) -> Result<(), SessionError> {
    state.sessions.sign_out(session.session_id).await
}

pub async fn verify_email(
    state: &AppState,
    email: Option<&str>,
    token: Option<&str>,
) -> Result<&'static str, VerifyEmailError> {
    let (Some(email), Some(token)) = (
        email.filter(|e| !e.trim().is_empty()),
        token.filter(|t| !t.is_empty()),
    ) else {
        return Err(VerifyEmailError::MissingFields);
    };
    let email = normalize_email(email);

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "verification for unknown email");
        return Err(VerifyEmailError::InvalidToken);
    };

    if !token_matches(token, user.email_verif_token.as_deref()) {
        warn!(user_id = %user.id, "verification token mismatch");
        return Err(VerifyEmailError::InvalidToken);
    }

    state.users.mark_verified(user.id).await?;
    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok(EMAIL_VERIFIED)
}

/// Rotates the pending token, so links from earlier mails stop working.
/// If the new mail cannot be sent the previous token is put back.
pub async fn resend_verification(
    state: &AppState,
    email: Option<&str>,
) -> Result<ResendOutcome, ResendError> {
    let email = email
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or(ResendError::MissingEmail)?;

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(ResendError::UnknownAccount)?;
    if user.is_verified() {
        return Err(ResendError::AlreadyVerified);
    }

    let token = generate_verification_token();
    state.users.set_verification_token(user.id, &token).await?;
    if let Err(e) = send_verification_email(state, &user.email, &token).await {
        if let Some(previous) = user.email_verif_token.as_deref() {
            if let Err(restore) = state.users.set_verification_token(user.id, previous).await {
                error!(error = %restore, user_id = %user.id, "could not restore verification token");
            }
        }
        return Err(ResendError::Notification(e));
    }

    info!(user_id = %user.id, "verification email re-sent");
    Ok(ResendOutcome {
        message: VERIFICATION_SENT,
        redirect: resend_redirect(&state.config.app_base_url, &user.email, true),
    })
}

pub async fn current_user(state: &AppState, user_id: Uuid) -> Result<Option<User>, StoreError> {
    state.users.find_by_id(user_id).await
}
