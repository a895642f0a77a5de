use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::anyhow;

use crate::service::lifecycle::LifecycleSettings;

const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017/complaint_tracker";
const DEFAULT_DATABASE: &str = "complaint_tracker";
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub database: String,
    pub port: u16,
    pub jwt_secret: String,
    pub lifecycle: LifecycleSettings,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|err| anyhow!("Invalid {}: {}", key, err)),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = LifecycleSettings::default();

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;

        let threshold_km = parse_or(&lookup, "PROXIMITY_THRESHOLD_KM", defaults.threshold_km)?;
        if !threshold_km.is_finite() || threshold_km <= 0.0 {
            return Err(anyhow!("PROXIMITY_THRESHOLD_KM must be a positive number"));
        }

        let timeout_secs = parse_or(
            &lookup,
            "LOCATION_TIMEOUT_SECS",
            defaults.location_timeout.as_secs(),
        )?;

        Ok(Self {
            mongo_uri: lookup("MONGO_URI").unwrap_or_else(|| DEFAULT_MONGO_URI.to_string()),
            database: lookup("MONGO_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            jwt_secret,
            lifecycle: LifecycleSettings {
                threshold_km,
                location_timeout: Duration::from_secs(timeout_secs),
                transitions: parse_or(&lookup, "TRANSITION_POLICY", defaults.transitions)?,
                max_photo_bytes: parse_or(&lookup, "MAX_PHOTO_BYTES", defaults.max_photo_bytes)?,
            },
        })
    }
}
