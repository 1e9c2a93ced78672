// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: aggregates, value objects, events, and persistence ports.

pub mod agent;
pub mod task;
pub mod trust;
pub mod audit;
pub mod events;
pub mod error;
pub mod config;
pub mod repository;
