// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Arbiter Trust Engine Core
//!
//! Domain model, scoring logic, and persistence ports for the Arbiter
//! task router.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Trust scoring, reassignment orchestration, audit

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
