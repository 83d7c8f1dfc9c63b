// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line interface of davsync.

mod arg;
mod cli;
mod cmd_collections;
mod cmd_record;
mod cmd_status;
mod cmd_sync;
mod config;
mod table;

pub use crate::cli::{Cli, Commands, run};
pub use crate::config::parse_config;
