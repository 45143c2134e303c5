// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain model of the Marathon stack engine.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Configuration values, labels, expansion state, machine
//!   records, credential ports and configuration

pub mod app_definition;
pub mod credential;
pub mod error;
pub mod expansion;
pub mod label;
pub mod machine;
pub mod protocol;
pub mod stack_config;
pub mod value;
