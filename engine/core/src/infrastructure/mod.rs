// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

pub mod db;
pub mod event_bus;
pub mod keyed_lock;
pub mod repositories;
