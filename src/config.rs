// src/config.rs
use std::time::Duration;

use url::Url;

use crate::error::ClientError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000";
const DEFAULT_PROCESSING_TIMEOUT_SECS: u64 = 120;
const DEFAULT_NOTICE_TTL_SECS: u64 = 4;

/// Image hosts the gallery will render from regardless of environment.
const BASE_IMAGE_HOSTS: [&str; 2] = ["localhost", "s3.amazonaws.com"];

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: Url,
    pub ws_url: Url,
    pub image_hosts: Vec<String>,
    /// `None` means the processing flag never times out.
    pub processing_timeout: Option<Duration>,
    pub notice_ttl: Duration,
}

impl ClientConfig {
    /// Read configuration from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = parse_url(
            "AVATAR_API_URL",
            &read("AVATAR_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        )?;
        let ws_url = parse_url(
            "AVATAR_WS_URL",
            &read("AVATAR_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
        )?;

        let mut image_hosts: Vec<String> = BASE_IMAGE_HOSTS.iter().map(|h| h.to_string()).collect();
        for key in ["AVATAR_S3_BUCKET_DOMAIN", "AVATAR_CLOUDFRONT_DOMAIN"] {
            if let Some(host) = read(key) {
                image_hosts.push(host.trim().to_lowercase());
            }
        }

        let timeout_secs = parse_secs("AVATAR_PROCESSING_TIMEOUT_SECS", read("AVATAR_PROCESSING_TIMEOUT_SECS"))?
            .unwrap_or(DEFAULT_PROCESSING_TIMEOUT_SECS);
        let processing_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        let notice_ttl = Duration::from_secs(
            parse_secs("AVATAR_NOTICE_TTL_SECS", read("AVATAR_NOTICE_TTL_SECS"))?
                .unwrap_or(DEFAULT_NOTICE_TTL_SECS),
        );

        Ok(Self { api_url, ws_url, image_hosts, processing_timeout, notice_ttl })
    }

    /// Whether an image URL points at an allow-listed host.
    pub fn allows_image(&self, raw: &str) -> bool {
        match Url::parse(raw) {
            Ok(url) => url
                .host_str()
                .is_some_and(|host| self.image_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))),
            Err(_) => false,
        }
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ClientError> {
    Url::parse(raw.trim()).map_err(|e| ClientError::Config(format!("{key}={raw}: {e}")))
}

fn parse_secs(key: &str, raw: Option<String>) -> Result<Option<u64>, ClientError> {
    raw.map(|v| {
        v.trim()
            .parse::<u64>()
            .map_err(|e| ClientError::Config(format!("{key}={v}: {e}")))
    })
    .transpose()
}
