use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Party-size thresholds driving escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationThresholds {
    /// Parties strictly larger than this need restaurant confirmation.
    pub large_group: u32,
    /// Parties of this size or more are handled as private events.
    pub private_event: u32,
}

impl Default for EscalationThresholds {
    fn default() -> Self {
        Self {
            large_group: 10,
            private_event: 45,
        }
    }
}

/// Times used when the caller gave only a meal word or a bare hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDefaults {
    pub lunch: NaiveTime,
    pub evening: NaiveTime,
    pub late: NaiveTime,
    /// Read an unqualified hour from 1 to 11 as PM ("at 8" is 20:00).
    pub assume_pm_for_bare_hours: bool,
}

impl Default for TimeDefaults {
    fn default() -> Self {
        Self {
            lunch: NaiveTime::from_hms_opt(13, 0, 0).unwrap_or(NaiveTime::MIN),
            evening: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
            late: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            assume_pm_for_bare_hours: true,
        }
    }
}

/// Per-call snapshot of the restaurant's settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantContext {
    pub name: String,
    pub contact_email: String,
    pub thresholds: EscalationThresholds,
    pub time_defaults: TimeDefaults,
}

impl RestaurantContext {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            name: config.restaurant_name.clone(),
            contact_email: config.restaurant_email.clone(),
            thresholds: config.thresholds,
            time_defaults: config.time_defaults,
        }
    }
}
