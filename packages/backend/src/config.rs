use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use chrono_tz::Tz;
use recall_algo::{MasteryPolicy, SchedulingPolicy, DEFAULT_STREAK_LOOKBACK_DAYS};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_parse::<u16>("PORT").unwrap_or(3000);

        let host = env_parse::<IpAddr>("HOST").unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        Self {
            host,
            port,
            log_level: log_level_from_env(),
            engine: EngineConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            log_level: "info".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

/// Log filter, readable before the rest of the config so that config
/// warnings reach an installed subscriber
pub fn log_level_from_env() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}

/// Which calendar day the new-word quota is counted against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaReset {
    UserLocal,
    Utc,
}

impl FromStr for QuotaReset {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "local" => Ok(Self::UserLocal),
            "utc" => Ok(Self::Utc),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub default_limit: u32,
    pub max_limit: u32,
    pub quota_reset: QuotaReset,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            quota_reset: QuotaReset::UserLocal,
        }
    }
}

impl QueueConfig {
    /// Missing limit gets the default; anything else is clamped to `[1, max_limit]`.
    pub fn clamp_limit(&self, requested: Option<i64>) -> u32 {
        match requested {
            None => self.default_limit,
            Some(value) => value.clamp(1, i64::from(self.max_limit.max(1))) as u32,
        }
    }
}

/// Fallbacks for users that never saved settings
#[derive(Debug, Clone)]
pub struct ReviewDefaults {
    pub timezone: Tz,
    pub daily_new_quota: u32,
}

impl Default for ReviewDefaults {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            daily_new_quota: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub scheduling: SchedulingPolicy,
    pub mastery: MasteryPolicy,
    pub queue: QueueConfig,
    pub defaults: ReviewDefaults,
    pub streak_lookback_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheduling: SchedulingPolicy::default(),
            mastery: MasteryPolicy::default(),
            queue: QueueConfig::default(),
            defaults: ReviewDefaults::default(),
            streak_lookback_days: DEFAULT_STREAK_LOOKBACK_DAYS,
        }
    }
}

/// Upper bound for the streak walk, about a century
pub const MAX_STREAK_LOOKBACK_DAYS: u32 = 36_500;

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable or invalid values keep the
    /// defaults and are reported with `warn!`.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut scheduling = SchedulingPolicy::default();
        override_from(&lookup, "SM2_INITIAL_EF", &mut scheduling.initial_easiness);
        override_from(&lookup, "SM2_MIN_EF", &mut scheduling.min_easiness);
        override_from(&lookup, "SM2_EF_BASE", &mut scheduling.ef_base);
        override_from(&lookup, "SM2_EF_LINEAR", &mut scheduling.ef_linear);
        override_from(&lookup, "SM2_EF_QUADRATIC", &mut scheduling.ef_quadratic);
        override_from(&lookup, "SM2_FIRST_INTERVAL", &mut scheduling.first_interval_days);
        override_from(&lookup, "SM2_SECOND_INTERVAL", &mut scheduling.second_interval_days);
        override_from(&lookup, "SM2_PASS_THRESHOLD", &mut scheduling.pass_threshold);
        if let Err(err) = scheduling.validate() {
            tracing::warn!(error = %err, "invalid SM-2 overrides, using defaults");
            scheduling = SchedulingPolicy::default();
        }

        let mut mastery = MasteryPolicy::default();
        override_from(&lookup, "MASTERY_MIN_REPETITIONS", &mut mastery.min_repetitions);
        override_from(&lookup, "MASTERY_MIN_EF", &mut mastery.min_easiness);
        override_from(&lookup, "MASTERY_MIN_INTERVAL_DAYS", &mut mastery.min_interval_days);
        if let Err(err) = mastery.validate() {
            tracing::warn!(error = %err, "invalid mastery overrides, using defaults");
            mastery = MasteryPolicy::default();
        }

        let mut queue = QueueConfig::default();
        override_from(&lookup, "DUE_DEFAULT_LIMIT", &mut queue.default_limit);
        override_from(&lookup, "DUE_MAX_LIMIT", &mut queue.max_limit);
        override_from(&lookup, "NEW_QUOTA_RESET", &mut queue.quota_reset);
        queue.max_limit = queue.max_limit.max(1);
        queue.default_limit = queue.default_limit.clamp(1, queue.max_limit);

        let mut defaults = ReviewDefaults::default();
        override_from(&lookup, "DEFAULT_TIMEZONE", &mut defaults.timezone);
        override_from(&lookup, "DEFAULT_DAILY_NEW_QUOTA", &mut defaults.daily_new_quota);

        let mut lookback = DEFAULT_STREAK_LOOKBACK_DAYS;
        override_from(&lookup, "STREAK_MAX_LOOKBACK_DAYS", &mut lookback);
        if lookback > MAX_STREAK_LOOKBACK_DAYS {
            tracing::warn!(
                requested = lookback,
                max = MAX_STREAK_LOOKBACK_DAYS,
                "streak lookback too large, clamping"
            );
        }

        Self {
            scheduling,
            mastery,
            queue,
            defaults,
            streak_lookback_days: lookback.clamp(1, MAX_STREAK_LOOKBACK_DAYS),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}

fn override_from<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparsable config value"),
    }
}
