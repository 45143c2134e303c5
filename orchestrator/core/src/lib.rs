// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Marathon Stack Core
//!
//! Transforms user-authored Marathon stack templates so that every
//! application instance boots the Koding agent with its own identity.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, transformation pipeline and adapters

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
