use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Outbound SMTP relay used for verification mail.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Sign-in providers the session layer accepts.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Credentials,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Credentials => "credentials",
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credentials" => Ok(Provider::Credentials),
            other => anyhow::bail!("unknown auth provider `{other}`"),
        }
    }
}

/// Outcome of the authorization predicate for one request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    /// No session on a protected path; send the caller to the sign-in page.
    SignIn,
    Redirect(String),
}

/// Options consulted by the session layer and the routing middleware.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub sign_in_path: String,
    pub home_path: String,
    pub protected_prefixes: Vec<String>,
    pub auth_pages: Vec<String>,
    pub providers: Vec<Provider>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            sign_in_path: "/login".into(),
            home_path: "/member".into(),
            protected_prefixes: vec!["/member".into()],
            auth_pages: vec!["/login".into(), "/signup".into()],
            providers: vec![Provider::Credentials],
        }
    }
}

impl AuthConfig {
    pub fn authorized(&self, logged_in: bool, path: &str) -> Access {
        let protected = self
            .protected_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()));

        if protected {
            return if logged_in { Access::Allow } else { Access::SignIn };
        }
        if logged_in && self.auth_pages.iter().any(|p| p == path) {
            return Access::Redirect(self.home_path.clone());
        }
        Access::Allow
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.iter().any(|p| p.as_str() == name)
    }

    fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let providers = match std::env::var("AUTH_PROVIDERS") {
            Ok(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(Provider::from_str)
                .collect::<anyhow::Result<Vec<_>>>()?,
            Err(_) => defaults.providers,
        };
        Ok(Self {
            sign_in_path: std::env::var("AUTH_SIGN_IN_PATH").unwrap_or(defaults.sign_in_path),
            home_path: std::env::var("AUTH_HOME_PATH").unwrap_or(defaults.home_path),
            protected_prefixes: std::env::var("AUTH_PROTECTED_PREFIXES")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.protected_prefixes),
            auth_pages: defaults.auth_pages,
            providers,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub app_base_url: Url,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let app_base_url = std::env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .parse::<Url>()
            .context("APP_BASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "authgate".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authgate-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let mail = MailConfig {
            host: std::env::var("MAIL_HOST").context("MAIL_HOST")?,
            port: std::env::var("MAIL_PORT")
                .or_else(|_| std::env::var("EMAIL_PORT"))
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(2525),
            username: std::env::var("MAIL_USERNAME").unwrap_or_default(),
            password: std::env::var("MAIL_PASSWORD").unwrap_or_default(),
            from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "\"Authgate\" <verification@test.com>".into()),
        };
        let auth = AuthConfig::from_env()?;
        Ok(Self {
            database_url,
            app_base_url,
            jwt,
            mail,
            auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_path_without_session_requires_sign_in() {
        let cfg = AuthConfig::default();
        assert_eq!(cfg.authorized(false, "/member"), Access::SignIn);
        assert_eq!(cfg.authorized(false, "/member/settings"), Access::SignIn);
        assert_eq!(cfg.authorized(true, "/member"), Access::Allow);
    }

    #[test]
    fn signed_in_user_is_sent_home_from_auth_pages() {
        let cfg = AuthConfig::default();
        assert_eq!(
            cfg.authorized(true, "/login"),
            Access::Redirect("/member".into())
        );
        assert_eq!(
            cfg.authorized(true, "/signup"),
            Access::Redirect("/member".into())
        );
        assert_eq!(cfg.authorized(false, "/login"), Access::Allow);
    }

    #[test]
    fn public_paths_are_always_allowed() {
        let cfg = AuthConfig::default();
        assert_eq!(cfg.authorized(false, "/email/verify"), Access::Allow);
        assert_eq!(cfg.authorized(true, "/health"), Access::Allow);
    }

    #[test]
    fn provider_parsing() {
        assert_eq!(
            "Credentials".parse::<Provider>().unwrap(),
            Provider::Credentials
        );
        assert!("github".parse::<Provider>().is_err());
        assert!(AuthConfig::default().has_provider("credentials"));
        assert!(!AuthConfig::default().has_provider("github"));
    }
}
