// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

pub mod metrics;
pub mod triggers;
pub mod score;
pub mod recalculation;
pub mod reassignment;
pub mod assignment;
pub mod audit;

// Re-export use cases for convenience
pub use recalculation::{
    RecalculationOutcome, StandardTrustScoringService, TrustDeltaOutcome, TrustDeltaRequest,
    TrustScoringService,
};
pub use reassignment::{ReassignmentOutcome, ReassignmentService, StandardReassignmentService};
pub use assignment::{
    AssignTaskRequest, AssignedTask, StandardTaskAssignmentService, TaskAssignmentService,
};
pub use audit::{
    FlaggedAgent, StandardTrustAuditService, TrendReport, TrustAuditReport, TrustAuditService,
};
