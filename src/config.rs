use std::env;

use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::models::{EscalationThresholds, Language, TimeDefaults};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub llm_provider: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub owner_phone: String,
    pub restaurant_name: String,
    pub restaurant_email: String,
    pub thresholds: EscalationThresholds,
    pub timezone: Tz,
    pub default_language: Language,
    pub booking_backend: String,
    pub booking_url: String,
    pub database_url: String,
    pub slot_capacity: u32,
    pub session_ttl_minutes: i64,
    pub time_defaults: TimeDefaults,
    pub nlu_timeout_secs: u64,
    pub booking_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = TimeDefaults::default();
        let thresholds = EscalationThresholds::default();

        Self {
            port: parsed("PORT", 3000),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            owner_phone: env::var("OWNER_PHONE").unwrap_or_default(),
            restaurant_name: env::var("RESTAURANT_NAME")
                .unwrap_or_else(|_| "Trattoria da Giulia".to_string()),
            restaurant_email: env::var("RESTAURANT_EMAIL").unwrap_or_default(),
            thresholds: EscalationThresholds {
                large_group: parsed("LARGE_GROUP_THRESHOLD", thresholds.large_group),
                private_event: parsed("EVENT_THRESHOLD", thresholds.private_event),
            },
            timezone: env::var("TIMEZONE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(chrono_tz::Europe::Rome),
            default_language: env::var("DEFAULT_LANGUAGE")
                .ok()
                .and_then(|v| Language::from_code(&v))
                .unwrap_or(Language::It),
            booking_backend: env::var("BOOKING_BACKEND").unwrap_or_else(|_| "sqlite".to_string()),
            booking_url: env::var("BOOKING_URL").unwrap_or_default(),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "dinnerline.db".to_string()),
            slot_capacity: parsed("SLOT_CAPACITY", 40),
            session_ttl_minutes: parsed("SESSION_TTL_MINUTES", 30),
            time_defaults: TimeDefaults {
                lunch: parsed_time("LUNCH_TIME", defaults.lunch),
                evening: parsed_time("EVENING_TIME", defaults.evening),
                late: parsed_time("LATE_TIME", defaults.late),
                assume_pm_for_bare_hours: parsed(
                    "ASSUME_PM_FOR_BARE_HOURS",
                    defaults.assume_pm_for_bare_hours,
                ),
            },
            nlu_timeout_secs: parsed("NLU_TIMEOUT_SECS", 15),
            booking_timeout_secs: parsed("BOOKING_TIMEOUT_SECS", 10),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parsed_time(key: &str, default: NaiveTime) -> NaiveTime {
    env::var(key)
        .ok()
        .and_then(|v| NaiveTime::parse_from_str(v.trim(), "%H:%M").ok())
        .unwrap_or(default)
}
