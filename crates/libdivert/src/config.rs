//! Mount configuration and redirect-prefix validation.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("redirect prefix must not be empty")]
    EmptyPrefix,
    #[error("redirect prefix {0:?} must not begin with '/'")]
    LeadingSlash(String),
    #[error("redirect prefix {0:?} must not end with '/'")]
    TrailingSlash(String),
}

/// Everything the mount needs to come up, validated once at bootstrap and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct MountSpec {
    pub mountpoint: PathBuf,
    pub alt: PathBuf,
    pub redirects: Vec<String>,
}

impl MountSpec {
    /// Builds a mount spec, rejecting any redirect prefix that is empty or
    /// carries a leading or trailing slash. Prefixes are interpreted
    /// relative to the mount root, so an absolute form is always a
    /// configuration mistake rather than a path to normalize.
    pub fn new(
        mountpoint: PathBuf,
        alt: PathBuf,
        redirects: Vec<String>,
    ) -> Result<Self, ConfigError> {
        for prefix in &redirects {
            validate_prefix(prefix)?;
        }

        Ok(Self {
            mountpoint,
            alt,
            redirects,
        })
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(ConfigError::EmptyPrefix);
    }
    if prefix.starts_with('/') {
        return Err(ConfigError::LeadingSlash(prefix.to_string()));
    }
    if prefix.ends_with('/') {
        return Err(ConfigError::TrailingSlash(prefix.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with(prefixes: &[&str]) -> Result<MountSpec, ConfigError> {
        MountSpec::new(
            PathBuf::from("/mnt"),
            PathBuf::from("/srv/alt"),
            prefixes.iter().map(|p| p.to_string()).collect(),
        )
    }

    #[test]
    fn accepts_plain_and_nested_prefixes() {
        let spec = spec_with(&["special", "cache/hot"]).unwrap();
        assert_eq!(spec.redirects, vec!["special", "cache/hot"]);
    }

    #[test]
    fn accepts_empty_redirect_list() {
        assert!(spec_with(&[]).is_ok());
    }

    #[test]
    fn rejects_empty_prefix() {
        assert_eq!(spec_with(&[""]).unwrap_err(), ConfigError::EmptyPrefix);
    }

    #[test]
    fn rejects_leading_slash() {
        assert_eq!(
            spec_with(&["/special"]).unwrap_err(),
            ConfigError::LeadingSlash("/special".into())
        );
    }

    #[test]
    fn rejects_trailing_slash() {
        assert_eq!(
            spec_with(&["special/"]).unwrap_err(),
            ConfigError::TrailingSlash("special/".into())
        );
    }

    #[test]
    fn first_invalid_prefix_wins() {
        let err = spec_with(&["ok", "/bad", "also/"]).unwrap_err();
        assert_eq!(err, ConfigError::LeadingSlash("/bad".into()));
    }
}
