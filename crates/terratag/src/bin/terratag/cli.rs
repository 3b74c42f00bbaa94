//! terratag cli interface

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use terratag::terraform::LanguageVersion;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Tags to add, as JSON object
    ///
    /// Example: {"env":"prod","team":"platform"}
    #[arg(short = 't', long = "tags", env = "TERRATAG_TAGS")]
    pub tags: String,

    /// Directory `terraform init` was run in
    #[arg(short = 'd', long = "dir", env = "TERRATAG_DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Skip files that terratag generated before (*.terratag.tf)
    #[arg(long = "skip-terratag-files", env = "TERRATAG_SKIP_TERRATAG_FILES")]
    pub skip_terratag_files: bool,

    /// Terraform version (11, 12, 0.11.14, 1.5.7, ...)
    ///
    /// Detected with `terraform version` when omitted.
    #[arg(long = "terraform-version", env = "TERRATAG_TERRAFORM_VERSION")]
    pub terraform_version: Option<LanguageVersion>,

    /// Provider schema, as printed by `terraform providers schema -json`
    ///
    /// Read from terraform when omitted.
    #[arg(long = "schema", env = "TERRATAG_SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Only tag resource types matching this regex
    #[arg(long = "filter", env = "TERRATAG_FILTER")]
    pub filter: Option<regex::Regex>,

    /// Rename tagged originals to *.tf.bak
    ///
    /// Terraform would otherwise load every resource twice.
    #[arg(long = "rename", env = "TERRATAG_RENAME")]
    pub rename: bool,

    /// Print a summary of the run
    #[arg(short = 'F', long = "report")]
    pub report: Option<OutputFormat>,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    Json,
    Yaml,
}
