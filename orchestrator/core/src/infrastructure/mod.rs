// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod template;
pub mod kite_key;
pub mod marathon_client;

pub use kite_key::JwtKiteKeyIssuer;
pub use marathon_client::MarathonClient;
pub use template::{StackTemplate, Template, TemplateError};
