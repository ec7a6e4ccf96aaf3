//! Command-line surface.
//!
//! Only informational flags exist. Single-dash long words such as
//! `-version` or `-info` are accepted alongside the usual `--version`.

use std::ffi::OsString;

use clap::{ArgAction, CommandFactory, Parser};

const BANNER_RULE_WIDTH: usize = 54;

#[derive(Parser, Debug, Default)]
#[command(
    name = "dbhammer",
    about = "Stored-procedure load generator",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Print version information and exit
    #[arg(short = 'v', long = "version", visible_alias = "ver", action = ArgAction::SetTrue)]
    pub version: bool,

    /// Print build information and exit
    #[arg(short = 'i', long = "info", action = ArgAction::SetTrue)]
    pub info: bool,

    /// Print help and exit
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    pub help: bool,
}

/// What the process should do after parsing arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliAction {
    Run,
    PrintInfo,
    PrintHelp,
}

impl Cli {
    /// Parses raw process arguments, including the program name.
    pub fn from_args<I>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    pub fn action(&self) -> CliAction {
        if self.help {
            CliAction::PrintHelp
        } else if self.version || self.info {
            CliAction::PrintInfo
        } else {
            CliAction::Run
        }
    }
}

/// Rewrites `-word` into `--word`. Single-letter flags and the program name
/// are left alone.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .enumerate()
        .map(|(position, arg)| {
            if position == 0 {
                return arg;
            }
            match arg.to_str() {
                Some(word) if is_single_dash_word(word) => OsString::from(format!("-{word}")),
                _ => arg,
            }
        })
        .collect()
}

fn is_single_dash_word(arg: &str) -> bool {
    arg.len() > 2
        && arg.starts_with('-')
        && !arg.starts_with("--")
        && arg[1..].chars().all(|c| c.is_ascii_alphabetic())
}

/// Build metadata printed by `-v` and `-i`.
pub fn info_banner() -> String {
    format!(
        "Product: {}\nVersion: {}\nDescription: {}\nCompany: {}\nLicense: {}\n{}\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_AUTHORS"),
        env!("CARGO_PKG_LICENSE"),
        "=".repeat(BANNER_RULE_WIDTH),
    )
}

pub fn help_text() -> String {
    format!("{}{}", info_banner(), Cli::command().render_help())
}
