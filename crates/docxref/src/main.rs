/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * docxref command-line entry point.
 */

//! docxref CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "docxref")]
#[command(version)]
#[command(about = "Numbered captions and cross-references for Word documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a project, Markdown file or intermediate JSON to docx/html
    Render {
        /// Input file or project directory (defaults to the current directory)
        input: Option<String>,

        /// Output format(s), comma separated (docx, html)
        #[arg(short = 't', long)]
        to: Option<String>,

        /// Write outputs to DIR
        #[arg(long)]
        output_dir: Option<String>,

        /// Numbering policy (restart-per-chapter, continuous)
        #[arg(long)]
        numbering: Option<String>,

        /// Anchor naming policy (semantic, word-native)
        #[arg(long)]
        anchors: Option<String>,

        /// Skip the word-processor field recompute pass
        #[arg(long)]
        no_recompute: bool,

        /// Seconds to wait for the recompute host
        #[arg(long)]
        recompute_timeout: Option<u64>,

        /// Report format (text, json)
        #[arg(long, default_value = "text")]
        report: String,

        /// Suppress console output
        #[arg(long)]
        quiet: bool,
    },

    /// Inspect the anchors and fields of an existing .docx package
    Check {
        /// Package to inspect
        file: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let quiet = matches!(cli.command, Commands::Render { quiet: true, .. });
    let default_filter = if quiet {
        "docxref=warn,docxref_core=warn"
    } else {
        "docxref=info,docxref_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Render {
            input,
            to,
            output_dir,
            numbering,
            anchors,
            no_recompute,
            recompute_timeout,
            report,
            quiet,
        } => commands::render::execute(commands::render::RenderArgs {
            input,
            to,
            output_dir,
            numbering,
            anchors,
            no_recompute,
            recompute_timeout,
            report,
            quiet,
        }),
        Commands::Check { file, json } => commands::check::execute(&file, json),
    }
}
