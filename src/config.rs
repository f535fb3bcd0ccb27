//! Runtime configuration, read from the environment or a `.env` file
use anyhow::Context;
use std::path::PathBuf;

pub const DEFAULT_ALLOWANCE: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveConfig {
    pub database_path: PathBuf,
    /// Days granted to a newly enrolled employee
    pub default_allowance: u32,
    /// How many times a balance update is retried when a concurrent write wins
    pub balance_retries: u32,
}

impl Default for LeaveConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("leave-approval.db"),
            default_allowance: DEFAULT_ALLOWANCE,
            balance_retries: 8,
        }
    }
}

impl LeaveConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Absent keys take the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let database_path = lookup("LEAVE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);
        let default_allowance = match lookup("LEAVE_DEFAULT_ALLOWANCE") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("LEAVE_DEFAULT_ALLOWANCE '{raw}' is not a day count"))?,
            None => defaults.default_allowance,
        };
        let balance_retries = match lookup("LEAVE_BALANCE_RETRIES") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("LEAVE_BALANCE_RETRIES '{raw}' is not a number"))?,
            None => defaults.balance_retries,
        };

        Ok(Self {
            database_path,
            default_allowance,
            balance_retries,
        })
    }
}
