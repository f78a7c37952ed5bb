use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{PgSessionStore, PgUserStore, SessionStore, UserStore};
use crate::auth::session::SessionManager;
use crate::config::AppConfig;
use crate::db;
use crate::mail::{Mailer, SmtpMailer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
    pub sessions: SessionManager,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let pool = db::connect(&config.database_url).await?;
        db::migrate(&pool).await;

        let mailer = Arc::new(SmtpMailer::new(&config.mail)?) as Arc<dyn Mailer>;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgSessionStore::new(pool)),
            mailer,
        ))
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        session_store: Arc<dyn SessionStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let sessions = SessionManager::new(
            config.auth.clone(),
            JwtKeys::from(&config.jwt),
            session_store,
        );
        Self {
            config: Arc::new(config),
            users,
            mailer,
            sessions,
        }
    }
}
