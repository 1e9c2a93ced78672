// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! Arbiter CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** HTTP client, command handlers, and server bootstrap

pub mod client;
pub mod commands;
pub mod serve;
