use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::FixedOffset;

use crate::notify::{EmailJsSettings, TemplateRegistry, DEFAULT_EMAILJS_API_URL};
use crate::pool::Pool;
use crate::workflow::{DEFAULT_APPROVAL_DWELL, PHILIPPINE_OFFSET_HOURS};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Present only when both the service id and user id are set.
    pub emailjs: Option<EmailJsSettings>,
    pub templates: TemplateRegistry,
    pub approval_dwell: Duration,
    pub display_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        let emailjs = match (
            non_blank(env::var("EMAILJS_SERVICE_ID").ok()),
            non_blank(env::var("EMAILJS_USER_ID").ok()),
        ) {
            (Some(service_id), Some(user_id)) => Some(EmailJsSettings {
                api_url: parse_api_url(env::var("EMAILJS_API_URL").ok()),
                service_id,
                user_id,
                access_token: non_blank(env::var("EMAILJS_ACCESS_TOKEN").ok()),
            }),
            _ => None,
        };

        let mut templates = TemplateRegistry::new();
        for pool in Pool::ALL {
            if let Ok(template_id) = env::var(pool.template_env_key()) {
                templates.insert(pool, template_id);
            }
        }

        let approval_dwell = parse_dwell(env::var("APPROVAL_DWELL_MS").ok())?;
        let display_offset = parse_offset(env::var("DISPLAY_UTC_OFFSET_HOURS").ok())?;

        Ok(Config {
            database_url,
            emailjs,
            templates,
            approval_dwell,
            display_offset,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

pub fn parse_api_url(value: Option<String>) -> String {
    non_blank(value)
        .map(|url| url.trim().to_string())
        .unwrap_or_else(|| DEFAULT_EMAILJS_API_URL.to_string())
}

pub fn parse_dwell(value: Option<String>) -> Result<Duration> {
    match non_blank(value) {
        None => Ok(DEFAULT_APPROVAL_DWELL),
        Some(raw) => {
            let millis = raw
                .trim()
                .parse::<u64>()
                .context("APPROVAL_DWELL_MS must be a whole number of milliseconds")?;
            Ok(Duration::from_millis(millis))
        }
    }
}

pub fn parse_offset(value: Option<String>) -> Result<FixedOffset> {
    let hours = match non_blank(value) {
        None => PHILIPPINE_OFFSET_HOURS,
        Some(raw) => raw
            .trim()
            .parse::<i32>()
            .context("DISPLAY_UTC_OFFSET_HOURS must be a whole number of hours")?,
    };
    FixedOffset::east_opt(hours * 3600)
        .with_context(|| format!("DISPLAY_UTC_OFFSET_HOURS out of range: {hours}"))
}
