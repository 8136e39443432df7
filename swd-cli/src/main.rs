//! SWD CLI - shrink and expand files with the SWD LZSS compressor.
//!
//! Writes whole-file streams and seekable block files, in standard or
//! Gameboy byte order.

mod commands;
mod utils;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use commands::{ShrinkArgs, cmd_auto, cmd_expand, cmd_info, cmd_shrink, cmd_test};
use std::io;

#[derive(Parser)]
#[command(name = "swd")]
#[command(author, version, about = "SWD LZSS file compressor")]
#[command(long_about = "
Shrinks files into SWD containers and expands them again.
A container holds either one compressed stream or a sequence of
independently compressed blocks reachable through a seek table.

Examples:
  swd shrink level1.map
  swd shrink -b '*.chr'
  swd shrink -g --block-size 4k tiles.bin
  swd shrink -d --parallel -b data/*.bin
  swd expand level1.swd
  swd expand -d '*.swd'
  swd auto *.*
  swd test *.swd
  swd info --json level1.swd
")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shrink files into SWD containers
    #[command(alias = "s")]
    Shrink {
        /// Files to shrink (wildcards allowed)
        #[arg(required = true)]
        files: Vec<String>,

        #[command(flatten)]
        shrink: ShrinkArgs,

        /// Write the output into an SWD/ subdirectory
        #[arg(short = 'd', long)]
        subdir: bool,

        /// Compress blocks on all cores (block files only)
        #[arg(short = 'P', long)]
        parallel: bool,

        /// Report per-file errors and carry on
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Expand SWD containers
    #[command(alias = "x")]
    Expand {
        /// Files to expand (wildcards allowed)
        #[arg(required = true)]
        files: Vec<String>,

        /// Write the output into an ORG/ subdirectory
        #[arg(short = 'd', long)]
        subdir: bool,

        /// Report per-file errors and carry on
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Expand SWD files and shrink everything else
    #[command(alias = "a")]
    Auto {
        /// Files to process (wildcards allowed)
        #[arg(required = true)]
        files: Vec<String>,

        #[command(flatten)]
        shrink: ShrinkArgs,

        /// Write the output into SWD/ or ORG/
        #[arg(short = 'd', long)]
        subdir: bool,

        /// Report per-file errors and carry on
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Show the header and seek table of SWD files
    #[command(alias = "i")]
    Info {
        /// SWD files to inspect
        #[arg(required = true)]
        files: Vec<String>,

        /// List every block
        #[arg(long)]
        blocks: bool,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Check that SWD files expand cleanly
    #[command(alias = "t")]
    Test {
        /// SWD files to test
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Print a shell completion script
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn log_level(verbose: u8, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn log_init(filter: log::LevelFilter) {
    use simplelog::*;
    let term = TermLogger::new(
        filter,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
    if CombinedLogger::init(vec![term]).is_err() {
        eprintln!("warning: logger already initialised");
    }
}

fn main() {
    let cli = Cli::parse();
    log_init(log_level(cli.verbose, cli.quiet));
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Shrink {
            files,
            shrink,
            subdir,
            parallel,
            keep_going,
        } => cmd_shrink(&files, &shrink, subdir, parallel, keep_going, quiet),
        Commands::Expand {
            files,
            subdir,
            keep_going,
        } => cmd_expand(&files, subdir, keep_going, quiet),
        Commands::Auto {
            files,
            shrink,
            subdir,
            keep_going,
        } => cmd_auto(&files, &shrink, subdir, keep_going, quiet),
        Commands::Info {
            files,
            blocks,
            json,
        } => cmd_info(&files, blocks, json),
        Commands::Test { files } => cmd_test(&files, !quiet),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "swd", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
