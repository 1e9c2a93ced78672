// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`arbiter-core`)
//!
//! HTTP surface that translates external requests into application service
//! calls. **No business logic lives here**; all real work is delegated to
//! application services in `crate::application`.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP/SSE (Axum) | REST endpoints + Server-Sent Events for engine event streaming |

pub mod api;
