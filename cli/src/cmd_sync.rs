// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command, arg, value_parser};
use colored::Colorize;
use davsync_core::{ChangeCounts, Config, ConflictStrategy, Davsync, SyncResult};

use crate::arg::{CommonArgs, OutputFormat};

#[derive(Debug, Clone, Copy)]
pub struct CmdSync {
    pub conflict: Option<ConflictStrategy>,
    pub output_format: OutputFormat,
}

impl Default for CmdSync {
    fn default() -> Self {
        Self {
            conflict: None,
            output_format: OutputFormat::Table,
        }
    }
}

impl CmdSync {
    pub const NAME: &str = "sync";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Synchronize the local contacts with the server")
            .arg(
                arg!(--conflict <STRATEGY> "How to resolve conflicts, overriding the config")
                    .value_parser(value_parser!(ConflictStrategy)),
            )
            .arg(CommonArgs::output_format())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            conflict: matches.get_one("conflict").copied(),
            output_format: CommonArgs::get_output_format(matches),
        }
    }

    pub fn configure(&self, config: &mut Config) {
        if let Some(conflict) = self.conflict {
            config.sync.conflict = conflict;
        }
    }

    #[tracing::instrument(skip(davsync))]
    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        tracing::debug!("syncing address book...");
        let result = davsync.sync().await?;

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            OutputFormat::Table => {
                let collection = davsync.remote().collection();
                print!("{}", format_result(collection.as_str(), &result));
            }
        }
        Ok(())
    }
}

fn format_result(collection: &str, result: &SyncResult) -> String {
    let mut out = String::new();
    let mark = if result.is_clean() {
        "✓".green()
    } else {
        "!".yellow()
    };
    let path = if result.fast_path {
        " (unchanged on server)"
    } else {
        ""
    };
    out.push_str(&format!("{mark} Synced {}{path}\n", collection.bold()));
    out.push_str(&format!("  local   {}\n", format_counts(&result.local)));
    out.push_str(&format!("  remote  {}\n", format_counts(&result.remote)));
    if result.resolved_conflicts > 0 {
        out.push_str(&format!(
            "  resolved {} conflict(s)\n",
            result.resolved_conflicts
        ));
    }

    if !result.conflicts.is_empty() {
        out.push_str(&format!("{}\n", "Conflicts:".yellow().bold()));
        for c in &result.conflicts {
            out.push_str(&format!("  {} {} ({})\n", c.local_id, c.href, c.kind));
        }
    }

    if !result.errors.is_empty() {
        out.push_str(&format!("{}\n", "Errors:".red().bold()));
        for e in &result.errors {
            out.push_str(&format!("  {}: {}\n", e.identity, e.message));
        }
    }
    out
}

fn format_counts(counts: &ChangeCounts) -> String {
    format!(
        "{} inserted, {} updated, {} deleted",
        counts.inserted, counts.updated, counts.deleted
    )
}
