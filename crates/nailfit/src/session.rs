//! Session identifiers supplied by the upload/booking collaborator.

use std::fmt;
use std::str::FromStr;

const MAX_SESSION_ID_LEN: usize = 128;

/// Validated session identifier.
///
/// Restricted to `[A-Za-z0-9_-]{1,128}` so it can be used verbatim as a
/// storage directory name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        validate_session_id(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> serde::Deserialize<'de> for SessionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

fn validate_session_id(raw: &str) -> Result<(), String> {
    if raw.is_empty() {
        return Err("session id must not be empty".to_string());
    }
    if raw.len() > MAX_SESSION_ID_LEN {
        return Err(format!(
            "session id must be at most {MAX_SESSION_ID_LEN} characters (got {})",
            raw.len()
        ));
    }
    if let Some(bad) = raw
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(format!("session id contains invalid character {bad:?}"));
    }
    Ok(())
}
