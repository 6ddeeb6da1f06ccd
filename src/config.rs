use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::{bail, Context};

use crate::flow::otp::{OtpPolicy, OTP_LEN};

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    /// `None` runs against the built-in demo catalog.
    pub hospital_api_url: Option<String>,
    pub api_timeout: Duration,
    pub ledger_path: PathBuf,
    pub otp: OtpPolicy,
    pub session_ttl_secs: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let defaults = OtpPolicy::default();
        let test_code = match get("OTP_TEST_CODE") {
            Some(code) => code.trim().to_string(),
            None => defaults.test_code,
        };
        if test_code.len() != OTP_LEN || !test_code.chars().all(|c| c.is_ascii_digit()) {
            bail!("OTP_TEST_CODE must be {} digits", OTP_LEN);
        }

        Ok(Self {
            bind: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            hospital_api_url: get("HOSPITAL_API_URL"),
            api_timeout: Duration::from_secs(parse_or(&get, "HOSPITAL_API_TIMEOUT_SECS", 10)?),
            ledger_path: PathBuf::from(
                get("TOKEN_LEDGER_PATH").unwrap_or_else(|| "hospital_tokens.json".to_string()),
            ),
            otp: OtpPolicy {
                test_code,
                accept_any_complete: parse_or(&get, "OTP_ACCEPT_ANY", false)?,
            },
            session_ttl_secs: parse_or(&get, "SESSION_TTL_SECS", 3600)?,
        })
    }
}

fn parse_or<T, G>(get: &G, name: &str, default: T) -> anyhow::Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(name) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, value)),
        None => Ok(default),
    }
}
