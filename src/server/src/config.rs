//! 服务配置（环境变量）

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::core::participation::LotteryDefaults;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub scheduler_interval: Duration,
    /// 未配置时管理接口一律拒绝
    pub admin_token: Option<String>,
    pub data_file: Option<PathBuf>,
    pub lottery_defaults: LotteryDefaults,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            scheduler_interval: crate::core::scheduler::DEFAULT_INTERVAL,
            admin_token: None,
            data_file: None,
            lottery_defaults: LotteryDefaults::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 便于测试注入变量
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let d = Self::default();
        let defaults = &d.lottery_defaults;

        let interval_secs: u64 = parse_or(&lookup, "SCHEDULER_INTERVAL_SECS", d.scheduler_interval.as_secs());
        let duration_hours: i64 = parse_or(&lookup, "LOTTERY_DURATION_HOURS", defaults.duration.num_hours());

        Self {
            port: parse_or(&lookup, "PORT", d.port),
            scheduler_interval: Duration::from_secs(interval_secs.max(1)),
            admin_token: lookup("ADMIN_TOKEN").filter(|t| !t.trim().is_empty()),
            data_file: lookup("DATA_FILE").filter(|p| !p.trim().is_empty()).map(PathBuf::from),
            lottery_defaults: LotteryDefaults {
                ticket_price: parse_or(&lookup, "DEFAULT_TICKET_PRICE", defaults.ticket_price),
                max_participants: parse_or(&lookup, "DEFAULT_MAX_PARTICIPANTS", defaults.max_participants),
                duration: chrono::Duration::hours(duration_hours.max(1)),
            },
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("环境变量 {}={} 无法解析，使用默认值 {}", key, raw, default);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let cfg = ServerConfig::from_lookup(|_| None);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.scheduler_interval, Duration::from_secs(60));
        assert!(cfg.admin_token.is_none());
        assert_eq!(cfg.lottery_defaults.ticket_price, 100);
        assert_eq!(cfg.lottery_defaults.max_participants, 10_000);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "9000"),
            ("SCHEDULER_INTERVAL_SECS", "abc"),
            ("ADMIN_TOKEN", "secret"),
            ("DEFAULT_TICKET_PRICE", "50"),
            ("LOTTERY_DURATION_HOURS", "2"),
        ]
        .into_iter()
        .collect();
        let cfg = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.scheduler_interval, Duration::from_secs(60));
        assert_eq!(cfg.admin_token.as_deref(), Some("secret"));
        assert_eq!(cfg.lottery_defaults.ticket_price, 50);
        assert_eq!(cfg.lottery_defaults.duration, chrono::Duration::hours(2));
    }
}
