use crate::constants::network::{ALLOWED_SCHEMES, TIMEOUT_API_REQUEST_MS};
use crate::errors::ToolError;
use crate::normalize::NormalizeDepth;
use crate::utils::feature_flags::flag_or;
use std::time::Duration;

pub const ENV_DOMAIN: &str = "KINTONE_DOMAIN";
pub const ENV_API_TOKEN: &str = "KINTONE_API_TOKEN";
pub const ENV_USERNAME: &str = "KINTONE_USERNAME";
pub const ENV_PASSWORD: &str = "KINTONE_PASSWORD";
pub const ENV_TIMEOUT_MS: &str = "KINTONE_TIMEOUT_MS";
pub const ENV_NORMALIZE_DEPTH: &str = "KINTONE_NORMALIZE_DEPTH";
pub const ENV_SNAP_DROPDOWNS: &str = "KINTONE_SNAP_DROPDOWNS";

#[derive(Clone, PartialEq, Eq)]
pub enum KintoneAuth {
    /// One or more comma-separated tokens, sent as-is.
    ApiToken(String),
    Password { username: String, password: String },
}

impl KintoneAuth {
    pub fn method(&self) -> &'static str {
        match self {
            KintoneAuth::ApiToken(_) => "api_token",
            KintoneAuth::Password { .. } => "password",
        }
    }
}

impl std::fmt::Debug for KintoneAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KintoneAuth::ApiToken(_) => f.write_str("ApiToken(***)"),
            KintoneAuth::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KintoneConfig {
    pub domain: String,
    pub auth: KintoneAuth,
    pub timeout: Duration,
}

impl KintoneConfig {
    pub fn base_url(&self) -> String {
        format!("https://{}", self.domain)
    }

    pub fn from_env() -> Result<Self, ToolError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ToolError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let domain = normalize_domain(read(ENV_DOMAIN).as_deref())?;
        let auth = match (read(ENV_API_TOKEN), read(ENV_USERNAME), read(ENV_PASSWORD)) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(config_error(
                    "API token and username/password cannot both be set",
                    format!("Set either {} or {}/{}", ENV_API_TOKEN, ENV_USERNAME, ENV_PASSWORD),
                ))
            }
            (Some(token), None, None) => KintoneAuth::ApiToken(token),
            (None, Some(username), Some(password)) => KintoneAuth::Password { username, password },
            (None, Some(_), None) => {
                return Err(config_error(
                    "password is required when a username is set",
                    format!("Set {}", ENV_PASSWORD),
                ))
            }
            (None, None, Some(_)) => {
                return Err(config_error(
                    "username is required when a password is set",
                    format!("Set {}", ENV_USERNAME),
                ))
            }
            (None, None, None) => {
                return Err(config_error(
                    "no kintone credentials configured",
                    format!("Set {} or {}/{}", ENV_API_TOKEN, ENV_USERNAME, ENV_PASSWORD),
                ))
            }
        };

        let timeout_ms = match read(ENV_TIMEOUT_MS) {
            None => TIMEOUT_API_REQUEST_MS,
            Some(raw) => raw.parse::<u64>().ok().filter(|ms| *ms > 0).ok_or_else(|| {
                config_error(
                    format!("{} must be a positive integer, got {:?}", ENV_TIMEOUT_MS, raw),
                    format!("Unset {} to use {} ms", ENV_TIMEOUT_MS, TIMEOUT_API_REQUEST_MS),
                )
            })?,
        };

        Ok(Self {
            domain,
            auth,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn config_error(message: impl Into<String>, hint: impl Into<String>) -> ToolError {
    ToolError::denied(format!("kintone is not configured: {}", message.into()))
        .with_code("NOT_CONFIGURED")
        .with_hint(hint)
}

fn normalize_domain(raw: Option<&str>) -> Result<String, ToolError> {
    let raw = raw.ok_or_else(|| {
        config_error(
            format!("{} is not set", ENV_DOMAIN),
            format!("Set {} to your subdomain, e.g. example.cybozu.com", ENV_DOMAIN),
        )
    })?;
    let lowered = raw.to_lowercase();
    let without_scheme = ALLOWED_SCHEMES
        .iter()
        .find_map(|scheme| lowered.strip_prefix(scheme))
        .unwrap_or(&lowered);
    let domain = without_scheme.trim_end_matches('/');
    let valid = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'));
    if !valid {
        return Err(config_error(
            format!("{} is not a valid domain: {:?}", ENV_DOMAIN, raw),
            "Use a host name such as example.cybozu.com",
        ));
    }
    Ok(domain.to_string())
}

/// Everything the server reads from the environment. A broken kintone section
/// is kept as the error it produced so that local tools keep working.
#[derive(Debug, Clone)]
pub struct Settings {
    pub kintone: Result<KintoneConfig, ToolError>,
    pub normalize_depth: NormalizeDepth,
    pub snap_dropdowns: bool,
    pub warnings: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let normalize_depth = match lookup(ENV_NORMALIZE_DEPTH) {
            None => NormalizeDepth::default(),
            Some(raw) => NormalizeDepth::parse(&raw).unwrap_or_else(|| {
                warnings.push(format!(
                    "{}={:?} is not recognised; using {}",
                    ENV_NORMALIZE_DEPTH,
                    raw,
                    NormalizeDepth::default().as_str()
                ));
                NormalizeDepth::default()
            }),
        };
        let snap_dropdowns = flag_or(lookup(ENV_SNAP_DROPDOWNS).as_deref(), true);
        Self {
            kintone: KintoneConfig::from_lookup(&lookup),
            normalize_depth,
            snap_dropdowns,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolErrorKind;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn token_config_strips_scheme() {
        let cfg = KintoneConfig::from_lookup(lookup(&[
            (ENV_DOMAIN, "https://Example.cybozu.com/"),
            (ENV_API_TOKEN, "abc"),
        ]))
        .unwrap();
        assert_eq!(cfg.domain, "example.cybozu.com");
        assert_eq!(cfg.base_url(), "https://example.cybozu.com");
        assert_eq!(cfg.auth, KintoneAuth::ApiToken("abc".into()));
        assert_eq!(cfg.timeout, Duration::from_millis(TIMEOUT_API_REQUEST_MS));
    }

    #[test]
    fn password_auth_requires_both_parts() {
        let err = KintoneConfig::from_lookup(lookup(&[
            (ENV_DOMAIN, "example.cybozu.com"),
            (ENV_USERNAME, "sato"),
        ]))
        .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Denied);
        assert_eq!(err.hint.as_deref(), Some("Set KINTONE_PASSWORD"));
    }

    #[test]
    fn mixed_auth_is_rejected() {
        let err = KintoneConfig::from_lookup(lookup(&[
            (ENV_DOMAIN, "example.cybozu.com"),
            (ENV_API_TOKEN, "abc"),
            (ENV_PASSWORD, "secret"),
        ]))
        .unwrap_err();
        assert_eq!(err.code, "NOT_CONFIGURED");
    }

    #[test]
    fn domain_without_dot_is_rejected() {
        let err = KintoneConfig::from_lookup(lookup(&[
            (ENV_DOMAIN, "localhost"),
            (ENV_API_TOKEN, "abc"),
        ]))
        .unwrap_err();
        assert!(err.message.contains("not a valid domain"));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = KintoneConfig::from_lookup(lookup(&[
            (ENV_DOMAIN, "example.cybozu.com"),
            (ENV_API_TOKEN, "abc"),
            (ENV_TIMEOUT_MS, "soon"),
        ]))
        .unwrap_err();
        assert!(err.message.contains(ENV_TIMEOUT_MS));
    }

    #[test]
    fn settings_survive_missing_kintone_config() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_NORMALIZE_DEPTH, "deep"),
            (ENV_SNAP_DROPDOWNS, "0"),
        ]));
        assert!(settings.kintone.is_err());
        assert_eq!(settings.normalize_depth, NormalizeDepth::Deep);
        assert!(!settings.snap_dropdowns);
        assert!(settings.warnings.is_empty());
    }

    #[test]
    fn unknown_depth_falls_back_with_warning() {
        let settings = Settings::from_lookup(lookup(&[(ENV_NORMALIZE_DEPTH, "full")]));
        assert_eq!(settings.normalize_depth, NormalizeDepth::Shallow);
        assert!(settings.snap_dropdowns);
        assert_eq!(settings.warnings.len(), 1);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let auth = KintoneAuth::Password {
            username: "sato".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", auth);
        assert!(rendered.contains("sato"));
        assert!(!rendered.contains("hunter2"));
    }
}
