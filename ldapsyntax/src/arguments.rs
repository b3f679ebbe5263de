use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use ldapsyntax::dn::DnVariant;

/// Parse distinguished names and LDIF files.
#[derive(Debug, Parser)]
#[command(name = "ldapsyntax", version, arg_required_else_help = true)]
pub struct Cmdline {
    #[command(subcommand)]
    pub command: Command,

    /// More log output on stderr; repeat for trace output.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse distinguished names and print them in RFC 2253 form.
    Dn(DnCommand),

    /// Parse an LDIF file and print it back in normalised form.
    Ldif(LdifCommand),
}

#[derive(Debug, Args)]
pub struct DnCommand {
    /// Syntax to read the names with.
    #[arg(long, value_enum, default_value_t = DnVariant::Rfc2253)]
    pub variant: DnVariant,

    /// Print the parse tree instead of the decoded name.
    #[arg(long, conflicts_with = "shape")]
    pub tree: bool,

    /// Print the rule structure of the parse tree.
    #[arg(long)]
    pub shape: bool,

    /// The names to parse.
    #[arg(value_name = "DN", required = true)]
    pub names: Vec<String>,
}

#[derive(Debug, Args)]
pub struct LdifCommand {
    /// Print the parse tree instead of the records.
    #[arg(long, conflicts_with = "check")]
    pub tree: bool,

    /// Only validate; print a one-line summary.
    #[arg(long)]
    pub check: bool,

    /// Also decode every record DN with this syntax.
    #[arg(long, value_enum, value_name = "VARIANT")]
    pub decode_dns: Option<DnVariant>,

    /// The file to read; `-` or nothing reads stdin.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

impl Cmdline {
    /// Default log level when `RUST_LOG` is not set.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

impl LdifCommand {
    /// The input path, or `None` for stdin.
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.file.as_ref().filter(|p| p.as_os_str() != "-")
    }
}
