use std::env;

use anyhow::Context;

use crate::aggregate::CohortOrder;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub cohort_order: CohortOrder,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            database_url: env_opt("DATABASE_URL"),
            max_connections: env_opt("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            cohort_order: env_opt("COHORT_ORDER")
                .map(|list| CohortOrder::parse(&list))
                .unwrap_or_default(),
        }
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance")
    }

    /// A non-empty `--cohort-order` flag replaces the configured order.
    pub fn with_cohort_order(mut self, flag: Option<&str>) -> Self {
        if let Some(order) = flag.map(CohortOrder::parse).filter(|o| !o.is_empty()) {
            self.cohort_order = order;
        }
        self
    }
}
