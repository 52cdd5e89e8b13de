//! Runtime configuration.
//!
//! Settings come from the environment (the binary loads `.env` first) and are
//! handed to the engines explicitly, so tests can point them at local fakes.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default base URL for node existence checks.
pub const DEFAULT_SITE_URL: &str = "http://localhost";

/// Staging root that exported file paths are written under.
pub const DEFAULT_STAGING_ROOT: &str = "/mnt/islandora_staging";

/// Default per-call timeout for remote lookups.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Default identity used to create taxonomy terms.
pub const DEFAULT_DRUPAL_USERNAME: &str = "workbench";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Repository base URL, used to build `/node/{id}` existence checks.
    pub site_url: String,
    /// Taxonomy base URL for term lookups and creation.
    pub term_lookup_url: String,
    pub drupal_username: String,
    /// Credential for term creation. Lookups work without it.
    pub drupal_password: Option<String>,
    /// Local directory that the staging root is mounted at.
    pub data_mount: PathBuf,
    pub staging_root: String,
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_url: DEFAULT_SITE_URL.to_string(),
            term_lookup_url: DEFAULT_SITE_URL.to_string(),
            drupal_username: DEFAULT_DRUPAL_USERNAME.to_string(),
            drupal_password: None,
            data_mount: PathBuf::new(),
            staging_root: DEFAULT_STAGING_ROOT.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let site_url = get("ISLE_SITE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string());

        let term_lookup_url = get("FABRICATOR_TERM_LOOKUP_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| site_url.clone());

        let http_timeout = match get("FABRICATOR_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "FABRICATOR_HTTP_TIMEOUT_SECS".to_string(),
                    value: raw.clone(),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            site_url,
            term_lookup_url,
            drupal_username: get("FABRICATOR_DRUPAL_USERNAME")
                .unwrap_or_else(|| DEFAULT_DRUPAL_USERNAME.to_string()),
            drupal_password: get("FABRICATOR_DRUPAL_PASSWORD")
                .or_else(|| get("ISLANDORA_WORKBENCH_PASSWORD")),
            data_mount: get("FABRICATOR_DATA_MOUNT").map(PathBuf::from).unwrap_or_default(),
            staging_root: get("FABRICATOR_STAGING_ROOT")
                .map(|r| r.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_STAGING_ROOT.to_string()),
            http_timeout,
        })
    }

    /// Build the HTTP client shared by every remote collaborator.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        Ok(reqwest::Client::builder().timeout(self.http_timeout).build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.site_url, DEFAULT_SITE_URL);
        assert_eq!(s.term_lookup_url, DEFAULT_SITE_URL);
        assert_eq!(s.drupal_username, "workbench");
        assert!(s.drupal_password.is_none());
        assert_eq!(s.staging_root, "/mnt/islandora_staging");
        assert_eq!(s.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_term_lookup_falls_back_to_site_url() {
        let s = settings(&[("ISLE_SITE_URL", "https://preserve.example.edu/")]).unwrap();
        assert_eq!(s.site_url, "https://preserve.example.edu");
        assert_eq!(s.term_lookup_url, "https://preserve.example.edu");
    }

    #[test]
    fn test_workbench_password_fallback() {
        let s = settings(&[("ISLANDORA_WORKBENCH_PASSWORD", "secret")]).unwrap();
        assert_eq!(s.drupal_password.as_deref(), Some("secret"));

        let s = settings(&[
            ("ISLANDORA_WORKBENCH_PASSWORD", "secret"),
            ("FABRICATOR_DRUPAL_PASSWORD", "preferred"),
        ])
        .unwrap();
        assert_eq!(s.drupal_password.as_deref(), Some("preferred"));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = settings(&[("FABRICATOR_HTTP_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("FABRICATOR_HTTP_TIMEOUT_SECS"));
    }
}
