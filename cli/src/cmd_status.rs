// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command};
use colored::Colorize;
use davsync_core::{CollectionTag, Davsync};

use crate::arg::{CommonArgs, OutputFormat};

#[derive(Debug, Clone, Copy)]
pub struct CmdStatus {
    pub output_format: OutputFormat,
}

impl CmdStatus {
    pub const NAME: &str = "status";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Show the state of the last sync and the pending local changes")
            .arg(CommonArgs::output_format())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            output_format: CommonArgs::get_output_format(matches),
        }
    }

    #[tracing::instrument(skip(davsync))]
    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        let state = davsync.sync_state().await?;
        let (records, pending) = davsync.address_book().count().await?;
        let status = Status {
            collection: davsync.remote().collection().to_string(),
            last_collection_tag: state.last_collection_tag,
            synced: state.entries.len(),
            records,
            pending,
        };

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
            OutputFormat::Table => print!("{status}"),
        }
        Ok(())
    }
}

#[derive(Debug, serde::Serialize)]
struct Status {
    collection: String,
    last_collection_tag: Option<CollectionTag>,
    synced: usize,
    records: i64,
    pending: i64,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} {}", "Collection:".bold(), self.collection)?;
        match &self.last_collection_tag {
            Some(tag) => writeln!(f, "{} {tag}", "Last tag:".bold())?,
            None => writeln!(f, "{} {}", "Last tag:".bold(), "never synced".italic())?,
        }
        writeln!(f, "{} {}", "Synced resources:".bold(), self.synced)?;
        writeln!(f, "{} {}", "Local contacts:".bold(), self.records)?;
        if self.pending > 0 {
            writeln!(
                f,
                "{} {}",
                "Pending changes:".bold(),
                self.pending.to_string().yellow()
            )
        } else {
            writeln!(f, "{} 0", "Pending changes:".bold())
        }
    }
}
