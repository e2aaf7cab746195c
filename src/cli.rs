//! # Command-line surface.
//!
//! ```text
//! -h | --help              usage on stderr, exit 0
//! -v | -V | --version      version on stdout, exit 0
//! -d | --no-daemon         run attached (no detach, log to stdout)
//! anything else            version on stdout, exit 10
//! ```
//!
//! Help and version are handled here rather than by clap's built-ins so the
//! output and exit codes stay fixed.

use clap::Parser;

/// Exit status for an unrecognized option.
pub const EXIT_BAD_OPTION: i32 = 10;

/// Parsed command-line flags.
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Show help.
    #[arg(short = 'h', long = "help")]
    pub help: bool,

    /// Show version.
    #[arg(short = 'v', short_alias = 'V', long = "version")]
    pub version: bool,

    /// Stay attached to the terminal and log to stdout.
    #[arg(short = 'd', long = "no-daemon")]
    pub no_daemon: bool,
}

/// What the binary should do after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    /// Unrecognized input: print the version and exit with [`EXIT_BAD_OPTION`].
    BadOption,
    Run { attached: bool },
}

/// Parses `args` (including the program name) into a [`Command`].
pub fn parse<I, T>(args: I) -> Command
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) if cli.help => Command::Help,
        Ok(cli) if cli.version => Command::Version,
        Ok(cli) => Command::Run {
            attached: cli.no_daemon,
        },
        Err(_) => Command::BadOption,
    }
}

/// Usage text.
pub fn usage(prog: &str) -> String {
    format!(
        "\n{prog} usage: {prog} [option]\n\
         options:\n\
         \x20  -h | --help            show help\n\
         \x20  -v | -V | --version    show version\n\
         \x20  -d | --no-daemon       run in the foreground, log to stdout\n"
    )
}

/// Version line.
pub fn version(prog: &str) -> String {
    format!("{prog} version {}", env!("CARGO_PKG_VERSION"))
}
