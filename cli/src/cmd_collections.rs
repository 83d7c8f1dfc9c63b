// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, io};

use clap::{ArgMatches, Command};
use colored::Color;
use davsync_core::{AddressBookCollection, Davsync};

use crate::table::{Column, Table};

#[derive(Debug, Default, Clone, Copy)]
pub struct CmdCollections;

impl CmdCollections {
    pub const NAME: &str = "collections";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("ls-remote")
            .about("List the address books on the server, marking the configured one")
    }

    pub fn from(_matches: &ArgMatches) -> Self {
        Self
    }

    #[tracing::instrument(skip(davsync))]
    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        let books = davsync.list_address_books().await?;
        if books.is_empty() {
            println!("No address books found");
            return Ok(());
        }

        let configured = davsync.remote().collection();
        let rows: Vec<_> = books
            .into_iter()
            .map(|book| Row {
                selected: book.href.same_resource(configured),
                book,
            })
            .collect();

        let columns = [
            CollectionColumn::Selected,
            CollectionColumn::Href,
            CollectionColumn::DisplayName,
        ];
        let table = Table {
            columns: &columns,
            separator: "  ",
            data: &rows,
        };
        table.write_to(&mut io::stdout())
    }
}

struct Row {
    selected: bool,
    book: AddressBookCollection,
}

enum CollectionColumn {
    Selected,
    Href,
    DisplayName,
}

impl Column<Row> for CollectionColumn {
    fn format(&self, row: &Row) -> String {
        match self {
            Self::Selected => String::from(if row.selected { "*" } else { " " }),
            Self::Href => row.book.href.to_string(),
            Self::DisplayName => row.book.display_name.clone().unwrap_or_default(),
        }
    }

    fn color(&self, row: &Row) -> Option<Color> {
        row.selected.then_some(Color::Green)
    }
}
