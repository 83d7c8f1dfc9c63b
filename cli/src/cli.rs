// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, ffi::OsString, path::PathBuf};

use clap::{ArgMatches, Command, ValueHint, arg, builder::styling, crate_version, value_parser};
use colored::Colorize;
use davsync_core::{APP_NAME, Config as CoreConfig, Davsync};
use futures::{FutureExt, future::BoxFuture};
use tracing_subscriber::EnvFilter;

use crate::arg::CommonArgs;
use crate::cmd_collections::CmdCollections;
use crate::cmd_record::{CmdRecordAdd, CmdRecordDelete, CmdRecordList};
use crate::cmd_status::CmdStatus;
use crate::cmd_sync::CmdSync;
use crate::config::parse_config;

/// Run the davsync command-line interface.
pub async fn run() -> Result<(), Box<dyn Error>> {
    match Cli::parse() {
        Ok(cli) => {
            init_tracing(cli.verbose);
            if let Err(e) = cli.run().await {
                println!("{} {}", "Error:".red(), e);
            }
        }
        Err(e) => println!("{} {}", "Error:".red(), e),
    }
    Ok(())
}

/// Logs go to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line interface
#[derive(Debug)]
pub struct Cli {
    /// Path to the configuration file
    pub config: Option<PathBuf>,

    /// Log at debug level
    pub verbose: bool,

    /// The command to execute
    pub command: Commands,
}

impl Cli {
    /// Create the command-line interface
    pub fn command() -> Command {
        const STYLES: styling::Styles = styling::Styles::styled()
            .header(styling::AnsiColor::Green.on_default().bold())
            .usage(styling::AnsiColor::Green.on_default().bold())
            .literal(styling::AnsiColor::Blue.on_default().bold())
            .placeholder(styling::AnsiColor::Cyan.on_default());

        Command::new(APP_NAME)
            .about("Two-way synchronization of a local address book with a CardDAV server.")
            .author("Zexin Yuan <aim@yzx9.xyz>")
            .version(crate_version!())
            .styles(STYLES)
            .subcommand_required(false) // allow default to sync
            .arg_required_else_help(false)
            .arg(
                arg!(-c --config [CONFIG] "Path to the configuration file")
                    .long_help(
                        "\
Path to the configuration file. Defaults to $XDG_CONFIG_HOME/davsync/config.toml on Linux and MacOS, \
%LOCALAPPDATA%/davsync/config.toml on Windows.",
                    )
                    .value_parser(value_parser!(PathBuf))
                    .value_hint(ValueHint::FilePath)
                    .global(true),
            )
            .arg(CommonArgs::verbose().global(true))
            .subcommand(CmdSync::command())
            .subcommand(CmdStatus::command())
            .subcommand(CmdCollections::command())
            .subcommand(
                Command::new("record")
                    .alias("r")
                    .about("Manage the local contacts")
                    .arg_required_else_help(true)
                    .subcommand_required(true)
                    .subcommand(CmdRecordAdd::command())
                    .subcommand(CmdRecordList::command())
                    .subcommand(CmdRecordDelete::command()),
            )
    }

    /// Parse the command-line arguments
    pub fn parse() -> Result<Self, Box<dyn Error>> {
        let commands = Self::command();
        let matches = commands.get_matches();
        Self::from(&matches)
    }

    /// Parse the given arguments
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let commands = Self::command();
        let matches = commands.try_get_matches_from(args)?;
        Self::from(&matches)
    }

    /// Create a CLI instance from the `ArgMatches`
    pub fn from(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        use Commands::*;
        let command = match matches.subcommand() {
            Some((CmdSync::NAME, matches)) => Sync(CmdSync::from(matches)),
            Some((CmdStatus::NAME, matches)) => Status(CmdStatus::from(matches)),
            Some((CmdCollections::NAME, matches)) => Collections(CmdCollections::from(matches)),
            Some(("record", matches)) => match matches.subcommand() {
                Some((CmdRecordAdd::NAME, matches)) => RecordAdd(CmdRecordAdd::from(matches)),
                Some((CmdRecordList::NAME, matches)) => RecordList(CmdRecordList::from(matches)),
                Some((CmdRecordDelete::NAME, matches)) => {
                    RecordDelete(CmdRecordDelete::from(matches))
                }
                _ => return Err("Unknown record command".into()),
            },
            None => Sync(CmdSync::default()),
            Some((name, _)) => return Err(format!("Unknown command: {name}").into()),
        };

        let config = matches.get_one("config").cloned();
        let verbose = CommonArgs::get_verbose(matches);
        Ok(Cli {
            config,
            verbose,
            command,
        })
    }

    /// Run the command
    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        self.command.run(self.config).await
    }
}

/// The commands available in the CLI
#[derive(Debug, Clone)]
pub enum Commands {
    /// Run one sync pass
    Sync(CmdSync),

    /// Show what the last pass saw and what is pending
    Status(CmdStatus),

    /// List the address books on the server
    Collections(CmdCollections),

    /// Add a contact from a vCard
    RecordAdd(CmdRecordAdd),

    /// List local contacts
    RecordList(CmdRecordList),

    /// Remove local contacts
    RecordDelete(CmdRecordDelete),
}

impl Commands {
    /// Run the command with the given configuration
    #[rustfmt::skip]
    pub async fn run(self, config: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
        use Commands::*;
        match self {
            Sync(a)         => Self::run_with(config, |c| a.configure(c), |x| a.run(x).boxed()).await,
            Status(a)       => Self::run_with(config, keep, |x| a.run(x).boxed()).await,
            Collections(a)  => Self::run_with(config, keep, |x| a.run(x).boxed()).await,
            RecordAdd(a)    => Self::run_with(config, keep, |x| a.run(x).boxed()).await,
            RecordList(a)   => Self::run_with(config, keep, |x| a.run(x).boxed()).await,
            RecordDelete(a) => Self::run_with(config, keep, |x| a.run(x).boxed()).await,
        }
    }

    async fn run_with<C, F>(config: Option<PathBuf>, configure: C, f: F) -> Result<(), Box<dyn Error>>
    where
        C: FnOnce(&mut CoreConfig),
        F: for<'a> FnOnce(&'a Davsync) -> BoxFuture<'a, Result<(), Box<dyn Error>>>,
    {
        tracing::debug!("parsing configuration...");
        let mut core_config = parse_config(config).await?;
        configure(&mut core_config);
        let davsync = Davsync::new(core_config).await?;

        let result = f(&davsync).await;
        davsync.close().await?;
        result
    }
}

fn keep(_: &mut CoreConfig) {}
