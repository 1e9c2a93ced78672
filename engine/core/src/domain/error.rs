// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! Engine-level error taxonomy.
//!
//! Validation problems fail fast with no partial effect. Store failures
//! propagate verbatim; they are never retried or swallowed. Empty-history
//! situations are NOT errors; the metric aggregator resolves them to
//! documented defaults.

use crate::domain::agent::{AgentId, AgentValidationError, Protocol};
use crate::domain::repository::RepositoryError;
use crate::domain::task::TaskId;
use crate::domain::trust::WeightsError;

#[derive(Debug, thiserror::Error)]
pub enum TrustEngineError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("no active agents available for protocol {0}")]
    NoAgentsAvailable(Protocol),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl From<AgentValidationError> for TrustEngineError {
    fn from(err: AgentValidationError) -> Self {
        TrustEngineError::Validation(err.to_string())
    }
}

impl From<WeightsError> for TrustEngineError {
    fn from(err: WeightsError) -> Self {
        TrustEngineError::Validation(err.to_string())
    }
}
