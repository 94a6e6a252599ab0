use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, StoreError};

/// Which version of a named artifact a reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Latest,
    Version(u32),
    Alias(String),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Latest => f.write_str("latest"),
            Selector::Version(version) => write!(f, "v{version}"),
            Selector::Alias(alias) => f.write_str(alias),
        }
    }
}

/// `name[:selector]`, e.g. `sample.csv:latest`, `clean_sample.csv:v3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub selector: Selector,
}

impl ArtifactRef {
    pub fn latest(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            selector: Selector::Latest,
        })
    }

    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |reason: &str| StoreError::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = reference.split(':');
        let name = parts.next().unwrap_or_default();
        let selector = parts.next();
        if parts.next().is_some() {
            return Err(invalid("more than one ':' separator"));
        }
        if name.is_empty() {
            return Err(invalid("artifact name is empty"));
        }
        validate_name(name)?;

        let selector = match selector {
            None => Selector::Latest,
            Some("") => return Err(invalid("version or alias after ':' is empty")),
            Some(raw) => parse_selector(raw).ok_or_else(|| invalid("not a valid version or alias"))?,
        };

        Ok(Self {
            name: name.to_string(),
            selector,
        })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.selector)
    }
}

impl FromStr for ArtifactRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

pub(crate) fn parse_selector(raw: &str) -> Option<Selector> {
    if raw == "latest" {
        return Some(Selector::Latest);
    }
    if let Some(digits) = raw.strip_prefix('v') {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            // Out-of-range numbers are rejected, not reread as aliases.
            return digits.parse().ok().map(Selector::Version);
        }
    }
    is_valid_token(raw).then(|| Selector::Alias(raw.to_string()))
}

/// Artifact names and aliases end up as object-key segments.
pub fn validate_name(name: &str) -> Result<()> {
    if is_valid_token(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

pub(crate) fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && !token.starts_with('.')
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
