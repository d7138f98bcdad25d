use crate::core::retry::RetryPolicy;
use crate::core::{HarvestError, HarvestResult};
use chrono::{FixedOffset, Offset, Utc};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "JOBHARVEST_";

/// Everything one scraper instance needs, passed in at construction.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub requests_per_sec: f64,
    /// `None` means a single token: one navigation per refill interval.
    pub bucket_capacity: Option<u32>,
    /// Offset used to resolve relative and zone-less posting dates.
    pub utc_offset: FixedOffset,
    pub ready_timeout: Duration,
    pub ready_poll_interval: Duration,
    pub retry: RetryPolicy,
    pub user_agent: Option<String>,
    pub user_agent_seed: Option<u64>,
    /// Add `search:`, `source:`, `company:` and similar tags to each posting.
    pub context_tags: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            requests_per_sec: 1.0,
            bucket_capacity: None,
            utc_offset: default_offset(),
            ready_timeout: Duration::from_secs(30),
            ready_poll_interval: Duration::from_millis(250),
            retry: RetryPolicy::default(),
            user_agent: None,
            user_agent_seed: None,
            context_tags: true,
        }
    }
}

fn default_offset() -> FixedOffset {
    // Asia/Kolkata, which observes no DST.
    FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap_or_else(|| Utc.fix())
}

/// Parses `+05:30`, `-0400`, `+09` or `Z`.
pub fn parse_utc_offset(raw: &str) -> HarvestResult<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let invalid = || HarvestError::Config(format!("invalid UTC offset: {:?}", raw));
    let (sign, rest) = match raw.chars().next() {
        Some('+') => (1, &raw[1..]),
        Some('-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if minutes >= 60 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn env_var(name: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, name))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> HarvestResult<Option<T>> {
    match env_var(name) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            HarvestError::Config(format!("{}{} has an invalid value: {:?}", ENV_PREFIX, name, raw))
        }),
        None => Ok(None),
    }
}

impl HarvestConfig {
    /// Defaults overridden by `JOBHARVEST_*` environment variables.
    pub fn from_env() -> HarvestResult<Self> {
        let mut config = Self::default();
        if let Some(rate) = env_parse::<f64>("REQUESTS_PER_SEC")? {
            config.requests_per_sec = rate;
        }
        if let Some(capacity) = env_parse::<u32>("BUCKET_CAPACITY")? {
            config.bucket_capacity = Some(capacity);
        }
        if let Some(offset) = env_var("UTC_OFFSET") {
            config.utc_offset = parse_utc_offset(&offset)?;
        }
        if let Some(secs) = env_parse::<u64>("READY_TIMEOUT_SECS")? {
            config.ready_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = env_parse::<usize>("MAX_ATTEMPTS")? {
            config.retry = config.retry.with_max_attempts(attempts);
        }
        config.user_agent = env_var("USER_AGENT");
        config.user_agent_seed = env_parse::<u64>("USER_AGENT_SEED")?;
        if let Some(context_tags) = env_parse::<bool>("CONTEXT_TAGS")? {
            config.context_tags = context_tags;
        }
        Ok(config)
    }

    pub fn with_rate(mut self, requests_per_sec: f64, capacity: Option<u32>) -> Self {
        self.requests_per_sec = requests_per_sec;
        self.bucket_capacity = capacity;
        self
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.ready_timeout = timeout;
        self.ready_poll_interval = poll_interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_context_tags(mut self, enabled: bool) -> Self {
        self.context_tags = enabled;
        self
    }
}

/// Where postings and tag records live.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// JSON file backing the store when no database is configured.
    pub data_file: PathBuf,
    pub mongodb_uri: Option<String>,
    pub database: String,
    pub jobs_collection: String,
    pub tags_collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("jobharvest_store.json"),
            mongodb_uri: None,
            database: "jobs_db".to_string(),
            jobs_collection: "jobs".to_string(),
            tags_collection: "job_tags".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            data_file: var("JOBHARVEST_DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_file),
            mongodb_uri: var("MONGODB_URI"),
            database: var("MONGODB_DB").unwrap_or(defaults.database),
            jobs_collection: var("MONGODB_JOBS_COLLECTION").unwrap_or(defaults.jobs_collection),
            tags_collection: var("MONGODB_TAGS_COLLECTION").unwrap_or(defaults.tags_collection),
        }
    }
}
