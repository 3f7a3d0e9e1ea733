use branchsweep_core::branch::MergeRelation;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "branchsweep")]
#[command(bin_name = "branchsweep")]
#[command(version)]
#[command(about = "Interactive cleanup of obsolete git branches")]
pub struct Cli {
    /// Without a subcommand the interactive screen opens.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Classify branches once and print the result")]
    List(ListArgs),
    #[command(about = "Run environment and configuration checks")]
    Doctor,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Reference branch candidates are compared against
    #[arg(long)]
    pub reference: Option<String>,

    /// Remote whose branches are considered when --remotes is set
    #[arg(long)]
    pub remote: Option<String>,

    /// Staleness threshold in days
    #[arg(long)]
    pub days: Option<u32>,

    /// Classify remote-tracking branches instead of local ones
    /// (overrides the config default either way)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub remotes: Option<bool>,

    /// Merge-relation policy: all, merged-only or nothing-to-merge
    #[arg(long, value_parser = parse_merge_relation)]
    pub relation: Option<MergeRelation>,

    /// Keep only branch names matching this regex
    #[arg(long)]
    pub pattern: Option<String>,
}

fn parse_merge_relation(value: &str) -> Result<MergeRelation, String> {
    MergeRelation::parse(value)
        .ok_or_else(|| "expected all, merged-only or nothing-to-merge".to_string())
}
