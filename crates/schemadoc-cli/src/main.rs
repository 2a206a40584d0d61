//! Schemadoc CLI - Command-line interface for the schema documentation generator

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod check;
mod generate;

#[derive(Parser)]
#[command(name = "schemadoc")]
#[command(version = schemadoc_core::VERSION)]
#[command(about = "WebExtension API schema documentation generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge schema fragments and write one RST page per namespace
    Generate {
        /// Directory holding the *.json schema fragments
        #[arg(long)]
        schema_dir: PathBuf,

        /// Static template tree to copy into the output directory
        #[arg(long)]
        template_dir: Option<PathBuf>,

        /// Output directory (cleared and recreated)
        #[arg(long)]
        out_dir: PathBuf,

        /// Locale file with permission description strings
        #[arg(long)]
        locale: Option<PathBuf>,

        /// Target manifest version for template condition blocks
        #[arg(long)]
        manifest_version: Option<u32>,

        /// Release channel for template condition blocks
        #[arg(long)]
        channel: Option<String>,

        /// Write the combined raw schema input to this file
        #[arg(long)]
        dump_schema: Option<PathBuf>,

        /// Print diagnostics as they are recorded
        #[arg(long)]
        verbose: bool,
    },

    /// Merge and resolve without writing pages, reporting problems
    Check {
        /// Directory holding the *.json schema fragments
        #[arg(long)]
        schema_dir: PathBuf,

        /// Locale file with permission description strings
        #[arg(long)]
        locale: Option<PathBuf>,

        /// Exit non-zero when any type reference stays unresolved
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            schema_dir,
            template_dir,
            out_dir,
            locale,
            manifest_version,
            channel,
            dump_schema,
            verbose,
        } => {
            let options = generate::GenerateOptions {
                schema_dir,
                template_dir,
                out_dir,
                locale,
                manifest_version,
                channel,
                dump_schema,
                verbose,
            };
            generate::run(&options)?;
        }

        Commands::Check {
            schema_dir,
            locale,
            strict,
        } => {
            let exit = check::run(&schema_dir, locale.as_deref(), strict)?;
            std::process::exit(exit);
        }
    }

    Ok(())
}
