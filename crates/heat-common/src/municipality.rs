//! Municipality identification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HeatError, HeatResult};

/// A municipality as typed by users: a name with an optional state suffix.
///
/// `"Campinas - SP"` parses to name `Campinas`, subdivision `SP`. The name is
/// the key for both the boundary catalog and the statistics service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Municipality {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdivision: Option<String>,
}

impl Municipality {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subdivision: None,
        }
    }

    /// Parse a user-supplied municipality label.
    pub fn parse(label: &str) -> HeatResult<Self> {
        let (name, subdivision) = match label.split_once(" - ") {
            Some((name, sub)) => (name.trim(), Some(sub.trim())),
            None => (label.trim(), None),
        };

        if name.is_empty() {
            return Err(HeatError::invalid("municipalityName", "Municipality name is required."));
        }

        Ok(Self {
            name: name.to_string(),
            subdivision: subdivision.filter(|s| !s.is_empty()).map(str::to_uppercase),
        })
    }
}

impl fmt::Display for Municipality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subdivision {
            Some(sub) => write!(f, "{} - {}", self.name, sub),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_state() {
        let m = Municipality::parse("Campinas - sp").unwrap();
        assert_eq!(m.name, "Campinas");
        assert_eq!(m.subdivision.as_deref(), Some("SP"));
        assert_eq!(m.to_string(), "Campinas - SP");
    }

    #[test]
    fn test_parse_plain_name() {
        let m = Municipality::parse("  São Paulo ").unwrap();
        assert_eq!(m.name, "São Paulo");
        assert!(m.subdivision.is_none());
    }

    #[test]
    fn test_parse_empty_rejected() {
        assert!(Municipality::parse("   ").is_err());
        assert!(Municipality::parse(" - SP").is_err());
    }
}
