// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Aggregate
//!
//! An agent is an autonomous worker registered under one communication
//! protocol. Its `trust_score` is the output of the trust engine and is
//! mutated only through the atomic score-change operation on
//! [`crate::domain::repository::AgentRepository`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lower bound of the trust score range.
pub const TRUST_SCORE_MIN: f64 = 0.0;
/// Upper bound of the trust score range.
pub const TRUST_SCORE_MAX: f64 = 100.0;
/// Neutral baseline assigned to freshly registered agents.
pub const INITIAL_TRUST_SCORE: f64 = 50.0;

/// Clamp a raw score into the canonical `[0, 100]` range.
pub fn clamp_trust_score(score: f64) -> f64 {
    score.clamp(TRUST_SCORE_MIN, TRUST_SCORE_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Communication protocol an agent speaks. Closed set; assignment and
/// reassignment pools are always per-protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Nlweb,
    Mcp,
    A2a,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Nlweb => "nlweb",
            Protocol::Mcp => "mcp",
            Protocol::A2a => "a2a",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = AgentValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nlweb" => Ok(Protocol::Nlweb),
            "mcp" => Ok(Protocol::Mcp),
            "a2a" => Ok(Protocol::A2a),
            other => Err(AgentValidationError::UnknownProtocol(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub protocol: Protocol,
    pub trust_score: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Register a new active agent with a clamped starting score.
    pub fn new(name: impl Into<String>, protocol: Protocol, trust_score: f64) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::new(),
            name: name.into(),
            protocol,
            trust_score: clamp_trust_score(trust_score),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a recomputed score. Callers persist the change together with
    /// its trust event through the repository.
    pub fn apply_score(&mut self, new_score: f64, at: DateTime<Utc>) {
        self.trust_score = clamp_trust_score(new_score);
        self.updated_at = at;
    }

    pub fn validate(&self) -> Result<(), AgentValidationError> {
        if self.name.trim().is_empty() {
            return Err(AgentValidationError::EmptyName);
        }
        if !(TRUST_SCORE_MIN..=TRUST_SCORE_MAX).contains(&self.trust_score) {
            return Err(AgentValidationError::TrustScoreOutOfRange(self.trust_score));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentValidationError {
    #[error("agent name cannot be empty")]
    EmptyName,

    #[error("trust score {0} outside [0, 100]")]
    TrustScoreOutOfRange(f64),

    #[error("unknown protocol '{0}' (expected nlweb, mcp, or a2a)")]
    UnknownProtocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_clamps_score_and_is_active() {
        let agent = Agent::new("translator", Protocol::Nlweb, 150.0);
        assert_eq!(agent.trust_score, 100.0);
        assert!(agent.is_active);
        assert!(agent.validate().is_ok());
    }

    #[test]
    fn test_apply_score_clamps_low() {
        let mut agent = Agent::new("translator", Protocol::Mcp, 50.0);
        agent.apply_score(-12.0, Utc::now());
        assert_eq!(agent.trust_score, 0.0);
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let mut agent = Agent::new("x", Protocol::A2a, 50.0);
        agent.name = "  ".to_string();
        assert_eq!(agent.validate(), Err(AgentValidationError::EmptyName));
    }

    #[test]
    fn test_protocol_serde_lowercase() {
        let json = serde_json::to_string(&Protocol::Nlweb).unwrap();
        assert_eq!(json, "\"nlweb\"");
        let parsed: Protocol = serde_json::from_str("\"a2a\"").unwrap();
        assert_eq!(parsed, Protocol::A2a);
    }

    #[test]
    fn test_protocol_from_str_rejects_unknown() {
        assert!("grpc".parse::<Protocol>().is_err());
        assert_eq!("mcp".parse::<Protocol>().unwrap(), Protocol::Mcp);
    }
}
