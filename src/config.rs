//! Process configuration resolved from the environment.
//!
//! Everything is read once at startup into an [`OutreachConfig`] that is then
//! passed by reference. Required values are checked lazily, when a command
//! actually needs them, and a gap surfaces as
//! [`OutreachError::ConfigurationMissing`].
use crate::delivery::Sender;
use crate::error::OutreachError;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const SENDGRID_API_KEY: &str = "SENDGRID_API_KEY";
pub const SENDGRID_EMAIL: &str = "SENDGRID_EMAIL";
pub const FROM_NAME: &str = "FROM_NAME";
pub const FROM_FIRST_NAME: &str = "FROM_FIRST_NAME";
pub const REQUESTY_API_KEY: &str = "REQUESTY_API_KEY";
pub const DB_LOCATION: &str = "DB_LOCATION";
pub const TEST_EMAIL: &str = "TEST_EMAIL";
pub const LOCAL_DB: &str = "LOCAL_DB";
pub const CLOUD_DB: &str = "CLOUD_DB";
pub const THREAD_DOMAIN: &str = "OUTREACH_THREAD_DOMAIN";
pub const AUDIENCE: &str = "OUTREACH_AUDIENCE";

const ALL_KEYS: [&str; 11] = [
    SENDGRID_API_KEY,
    SENDGRID_EMAIL,
    FROM_NAME,
    FROM_FIRST_NAME,
    REQUESTY_API_KEY,
    DB_LOCATION,
    TEST_EMAIL,
    LOCAL_DB,
    CLOUD_DB,
    THREAD_DOMAIN,
    AUDIENCE,
];

pub const DEFAULT_THREAD_DOMAIN: &str = "outreach.mail";
pub const DEFAULT_AUDIENCE: &str = "finance influencer";

/// Which record store the run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbLocation {
    /// Developer store; real sends are redirected to `TEST_EMAIL`.
    Local,
    Cloud,
}

impl FromStr for DbLocation {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "local" | "localDB" => Ok(Self::Local),
            "cloud" | "cloudDB" => Ok(Self::Cloud),
            other => Err(anyhow!(
                "{DB_LOCATION} must be \"local\" or \"cloud\" (got {other:?})"
            )),
        }
    }
}

impl fmt::Display for DbLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Cloud => write!(f, "cloud"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutreachConfig {
    values: BTreeMap<&'static str, String>,
}

impl OutreachConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = BTreeMap::new();
        for key in ALL_KEYS {
            if let Some(value) = lookup(key) {
                let value = value.trim();
                if !value.is_empty() {
                    values.insert(key, value.to_string());
                }
            }
        }
        Self { values }
    }

    fn optional(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn required(&self, key: &str) -> Result<&str> {
        self.optional(key)
            .ok_or_else(|| OutreachError::missing_config(key).into())
    }

    pub fn sendgrid_api_key(&self) -> Result<&str> {
        self.required(SENDGRID_API_KEY)
    }

    pub fn requesty_api_key(&self) -> Result<&str> {
        self.required(REQUESTY_API_KEY)
    }

    pub fn sender(&self) -> Result<Sender> {
        Ok(Sender {
            email: self.required(SENDGRID_EMAIL)?.to_string(),
            name: self.required(FROM_NAME)?.to_string(),
        })
    }

    /// Name used to sign generated emails.
    pub fn signature_name(&self) -> Option<&str> {
        self.optional(FROM_FIRST_NAME)
            .or_else(|| self.optional(FROM_NAME))
    }

    pub fn db_location(&self) -> Result<DbLocation> {
        self.required(DB_LOCATION)?.parse()
    }

    pub fn test_email(&self) -> Result<&str> {
        self.required(TEST_EMAIL)
    }

    pub fn thread_domain(&self) -> &str {
        self.optional(THREAD_DOMAIN).unwrap_or(DEFAULT_THREAD_DOMAIN)
    }

    pub fn audience(&self) -> &str {
        self.optional(AUDIENCE).unwrap_or(DEFAULT_AUDIENCE)
    }

    /// Directory holding the record store and the chat audit log.
    pub fn store_dir(&self) -> Result<PathBuf> {
        match self.db_location()? {
            DbLocation::Local => {
                if let Some(path) = self.optional(LOCAL_DB) {
                    return Ok(PathBuf::from(path));
                }
                let data_dir = dirs::data_local_dir()
                    .or_else(dirs::home_dir)
                    .ok_or_else(|| anyhow!("cannot determine home directory"))?;
                Ok(data_dir.join("outreach").join("local"))
            }
            DbLocation::Cloud => Ok(PathBuf::from(self.required(CLOUD_DB)?)),
        }
    }
}
