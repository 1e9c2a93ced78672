// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Arbiter CLI

pub mod agent;
pub mod config;
pub mod status;
pub mod task;
pub mod trust;

pub use self::agent::AgentCommand;
pub use self::config::ConfigCommand;
pub use self::task::TaskCommand;
pub use self::trust::TrustCommand;
