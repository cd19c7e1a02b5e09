use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

use santa_core::{check_participants, DrawError, Participant};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_CURRENCY: &str = "лв";

pub const DEFAULT_PARTICIPANTS: [&str; 5] =
    ["Теодор", "Николай", "Александър", "Маргарита", "Габриела"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid participant list: {0}")]
    Participants(#[from] DrawError),
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub participants: Vec<Participant>,
    pub admin_password: String,
    // Shown after the gift limit; empty shows the bare value.
    pub currency: String,
    // When set, the document lives in Postgres instead of `data_file`.
    pub database_url: Option<String>,
    pub data_file: PathBuf,
    pub static_dir: PathBuf,
    pub mail: Option<MailConfig>,
    pub mail_timeout: Duration,
}

#[derive(Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub user: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let participants = match var("SANTA_PARTICIPANTS") {
            Some(raw) => parse_participants(&raw),
            None => {
                info!("SANTA_PARTICIPANTS not set, using the built-in list");
                DEFAULT_PARTICIPANTS.iter().map(|s| s.to_string()).collect()
            }
        };
        check_participants(&participants)?;

        let admin_password = var("ADMIN_PASS").unwrap_or_else(|| {
            warn!("ADMIN_PASS not set, using the default password");
            "admin123".to_string()
        });

        let mail = match (var("EMAIL_USER"), var("EMAIL_PASS")) {
            (Some(user), Some(password)) => Some(MailConfig {
                smtp_host: with_default(var("SMTP_HOST"), "SMTP_HOST", "smtp.gmail.com"),
                user,
                password,
            }),
            _ => {
                warn!("EMAIL_USER or EMAIL_PASS not set, mail notifications disabled");
                None
            }
        };

        // Unlike other keys, an explicitly empty GIFT_CURRENCY is honoured.
        let currency = lookup("GIFT_CURRENCY")
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| {
                info!("GIFT_CURRENCY not set, using default: {DEFAULT_CURRENCY}");
                DEFAULT_CURRENCY.to_string()
            });

        Ok(Self {
            port: parse_or("PORT", var("PORT"), 3000)?,
            participants,
            admin_password,
            currency,
            database_url: var("DATABASE_URL"),
            data_file: with_default(var("DATA_FILE"), "DATA_FILE", "database.json").into(),
            static_dir: with_default(var("STATIC_DIR"), "STATIC_DIR", "public").into(),
            mail,
            mail_timeout: Duration::from_secs(parse_or(
                "MAIL_TIMEOUT_SECS",
                var("MAIL_TIMEOUT_SECS"),
                10,
            )?),
        })
    }

    pub fn local(participants: Vec<Participant>, data_file: impl Into<PathBuf>) -> Self {
        Self {
            port: 3000,
            participants,
            admin_password: "admin123".to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            database_url: None,
            data_file: data_file.into(),
            static_dir: PathBuf::from("public"),
            mail: None,
            mail_timeout: Duration::from_secs(10),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("participants", &self.participants)
            .field("admin_password", &"<redacted>")
            .field("currency", &self.currency)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("data_file", &self.data_file)
            .field("static_dir", &self.static_dir)
            .field("mail", &self.mail)
            .field("mail_timeout", &self.mail_timeout)
            .finish()
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn parse_participants(raw: &str) -> Vec<Participant> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn with_default(value: Option<String>, key: &str, default: &str) -> String {
    value.unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
