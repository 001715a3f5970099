//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Functional flow diagram tooling
#[derive(Parser, Debug)]
#[command(name = "flowdesign")]
#[command(version)]
#[command(about = "Create, inspect, and export functional flow diagrams")]
#[command(
    long_about = "Works with the JSON documents the flow designer saves: bootstrap a new diagram, report on an existing one, or export it to a one-page PDF without a browser."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default Start -> End diagram
    New {
        /// Output file
        #[arg(short, long)]
        out: PathBuf,

        /// Diagram name
        #[arg(short, long)]
        name: Option<String>,

        /// Diagram description
        #[arg(short, long)]
        description: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },

    /// Summarize a diagram document
    Inspect {
        /// Diagram document (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Export a diagram document to PDF
    Export {
        /// Diagram document (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Project identifier printed in the page footer
        #[arg(short, long, env = "FLOWDESIGN_PROJECT_ID")]
        project_id: i64,

        /// Directory the PDF is written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Designer configuration (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_defaults_out_dir() {
        let cli = Cli::try_parse_from(["flowdesign", "export", "--input", "flow.json", "--project-id", "7"]);
        let Ok(Cli {
            command: Commands::Export {
                project_id,
                out_dir,
                config,
                ..
            },
        }) = cli
        else {
            panic!("export should parse: {cli:?}");
        };
        assert_eq!(project_id, 7);
        assert_eq!(out_dir, PathBuf::from("."));
        assert!(config.is_none());
    }

    #[test]
    fn test_export_requires_project_id() {
        let cli = Cli::try_parse_from(["flowdesign", "export", "--input", "flow.json"]);
        if std::env::var_os("FLOWDESIGN_PROJECT_ID").is_none() {
            assert!(cli.is_err());
        }
    }
}
