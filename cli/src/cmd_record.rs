// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, io, path::PathBuf};

use clap::{ArgMatches, Command, ValueHint, arg, value_parser};
use colored::{Color, Colorize};
use davsync_core::{Body, Davsync, LocalId, LocalRecord};
use tokio::io::AsyncReadExt;

use crate::arg::{CommonArgs, OutputFormat};
use crate::table::{Column, PaddingDirection, Table};

#[derive(Debug, Clone)]
pub struct CmdRecordAdd {
    /// vCard file, `None` reads stdin
    pub file: Option<PathBuf>,
}

impl CmdRecordAdd {
    pub const NAME: &str = "add";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("new")
            .about("Add a contact from a vCard file, pushed by the next sync")
            .arg(
                arg!([FILE] "vCard file to read, stdin if omitted")
                    .value_parser(value_parser!(PathBuf))
                    .value_hint(ValueHint::FilePath),
            )
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            file: matches.get_one("FILE").cloned(),
        }
    }

    #[tracing::instrument(skip(davsync))]
    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        let text = match &self.file {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("Failed to read {}: {e}", path.display()))?,
            None => {
                let mut text = String::new();
                tokio::io::stdin().read_to_string(&mut text).await?;
                text
            }
        };

        let body = parse_vcard(&text)?;
        let id = davsync.address_book().create(&body).await?;
        println!("Added contact {}", id.to_string().bold());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CmdRecordList {
    pub output_format: OutputFormat,
}

impl CmdRecordList {
    pub const NAME: &str = "list";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("ls")
            .about("List the local contacts")
            .arg(CommonArgs::output_format())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            output_format: CommonArgs::get_output_format(matches),
        }
    }

    #[tracing::instrument(skip(davsync))]
    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        let records = davsync.address_book().list().await?;
        let views: Vec<_> = records.iter().map(RecordView::from).collect();

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&views)?),
            OutputFormat::Table if views.is_empty() => {
                println!("{}", "No contacts".italic());
            }
            OutputFormat::Table => {
                let columns = [
                    RecordColumn::Id,
                    RecordColumn::State,
                    RecordColumn::Name,
                    RecordColumn::Href,
                ];
                let table = Table {
                    columns: &columns,
                    separator: "  ",
                    data: &views,
                };
                table.write_to(&mut io::stdout())?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CmdRecordDelete {
    pub ids: Vec<i64>,
}

impl CmdRecordDelete {
    pub const NAME: &str = "delete";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("rm")
            .about("Remove contacts, the removal reaches the server with the next sync")
            .arg(
                arg!(<ID> ... "Ids of the contacts to remove")
                    .value_parser(value_parser!(i64)),
            )
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            ids: matches
                .get_many::<i64>("ID")
                .map(|ids| ids.copied().collect())
                .unwrap_or_default(),
        }
    }

    #[tracing::instrument(skip(davsync))]
    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        for id in self.ids {
            davsync.address_book().remove(LocalId(id)).await?;
            println!("Removed contact {}", id.to_string().bold());
        }
        Ok(())
    }
}

/// A contact as shown to the user.
#[derive(Debug, serde::Serialize)]
struct RecordView {
    id: LocalId,
    name: Option<String>,
    href: Option<String>,
    pending: bool,
}

impl From<&LocalRecord> for RecordView {
    fn from(record: &LocalRecord) -> Self {
        Self {
            id: record.local_id,
            name: display_name(record.body.as_str()).map(ToString::to_string),
            href: record.href.as_ref().map(ToString::to_string),
            pending: record.dirty,
        }
    }
}

enum RecordColumn {
    Id,
    State,
    Name,
    Href,
}

impl Column<RecordView> for RecordColumn {
    fn format(&self, view: &RecordView) -> String {
        match self {
            Self::Id => view.id.to_string(),
            Self::State => match (&view.href, view.pending) {
                (None, _) => "new",
                (Some(_), true) => "modified",
                (Some(_), false) => "synced",
            }
            .to_string(),
            Self::Name => view.name.clone().unwrap_or_default(),
            Self::Href => view.href.clone().unwrap_or_default(),
        }
    }

    fn padding_direction(&self) -> PaddingDirection {
        match self {
            Self::Id => PaddingDirection::Right,
            _ => PaddingDirection::Left,
        }
    }

    fn color(&self, view: &RecordView) -> Option<Color> {
        match self {
            Self::State if view.pending => Some(Color::Yellow),
            _ => None,
        }
    }
}

fn parse_vcard(text: &str) -> Result<Body, Box<dyn Error>> {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if !first.trim().eq_ignore_ascii_case("BEGIN:VCARD") {
        return Err("Input is not a vCard, expected it to start with BEGIN:VCARD".into());
    }
    Ok(Body::from(text.trim_start()))
}

/// The `FN` property of a vCard, ignoring its parameters.
fn display_name(vcard: &str) -> Option<&str> {
    vcard.lines().find_map(|line| {
        let (name, value) = line.trim_end_matches('\r').split_once(':')?;
        let name = name.split(';').next()?;
        name.eq_ignore_ascii_case("FN").then_some(value)
    })
}
