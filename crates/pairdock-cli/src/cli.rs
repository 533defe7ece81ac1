use clap::{Args, Parser, Subcommand, ValueEnum};
use pairdock::core::models::score::SourceKind;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "pairdock - batch pairwise protein docking (MEGADOCK, HDOCK) and complex prediction (AlphaFold3), with resumable jobs and merged score tables.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one docking or prediction tool over every pair of a pair list.
    Dock(DockArgs),
    /// Merge the result tables of several tools into one table.
    Merge(MergeArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    Megadock,
    Hdock,
    #[value(name = "alphafold")]
    AlphaFold,
}

impl ToolName {
    pub fn source(self) -> SourceKind {
        match self {
            ToolName::Megadock => SourceKind::Megadock,
            ToolName::Hdock => SourceKind::Hdock,
            ToolName::AlphaFold => SourceKind::AlphaFold,
        }
    }

    /// File the result table goes to when `--result-file` is not given.
    pub fn default_result_file(self) -> &'static str {
        match self {
            ToolName::Megadock => "megadock_result.txt",
            ToolName::Hdock => "hdock_result.txt",
            ToolName::AlphaFold => "alphafold_result.txt",
        }
    }
}

/// Arguments for the `dock` subcommand.
#[derive(Args, Debug)]
pub struct DockArgs {
    // --- Core Arguments ---
    /// The tool to run.
    #[arg(value_enum)]
    pub tool: ToolName,

    /// Pair list: one whitespace-separated `ID1 ID2` pair per line.
    #[arg(short = 'l', long, required = true, value_name = "PATH")]
    pub pair_list: PathBuf,

    /// Directory of `<ID>.pdb` files (MEGADOCK, HDOCK) or a FASTA file (AlphaFold).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory holding every per-pair artifact; reused across runs to resume.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output_dir: PathBuf,

    /// Where to write the tool's result table.
    #[arg(short, long, value_name = "PATH")]
    pub result_file: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Scheduler Overrides ---
    /// Number of pairs processed concurrently.
    #[arg(short = 'w', long, value_name = "NUM")]
    pub workers: Option<usize>,

    /// Per-stage timeout in seconds; 0 disables it.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    // --- Runtime Overrides ---
    /// Run the tool's executables from this directory on the host.
    #[arg(long, value_name = "PATH", conflicts_with = "image")]
    pub bin_dir: Option<PathBuf>,

    /// Run the tool inside this container image.
    #[arg(long, value_name = "IMAGE")]
    pub image: Option<String>,

    // --- AlphaFold Overrides ---
    /// AlphaFold3 model parameter directory.
    #[arg(long, value_name = "PATH")]
    pub model_dir: Option<PathBuf>,

    /// AlphaFold3 public database directory.
    #[arg(long, value_name = "PATH")]
    pub database_dir: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S megadock.decoys=3600
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `merge` subcommand.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// MEGADOCK result table (headerless `ID1 ID2 score`).
    #[arg(long, value_name = "PATH")]
    pub megadock: Option<PathBuf>,

    /// HDOCK result table (headerless `ID1 ID2 score`).
    #[arg(long, value_name = "PATH")]
    pub hdock: Option<PathBuf>,

    /// AlphaFold result table (`Pair`, `PTM`, `IPTM` columns).
    #[arg(long = "af", value_name = "PATH")]
    pub alphafold: Option<PathBuf>,

    /// Output file for the merged table.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Do not write the interpretation legend above the table.
    #[arg(long)]
    pub no_legend: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dock_arguments_parse() {
        let cli = Cli::try_parse_from([
            "pairdock", "-vv", "dock", "hdock", "-l", "pairs.txt", "-i", "pdb", "-o", "out",
            "-w", "8", "-S", "hdock.angle=10",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Dock(args) = cli.command else {
            panic!("expected the dock subcommand");
        };
        assert_eq!(args.tool, ToolName::Hdock);
        assert_eq!(args.workers, Some(8));
        assert_eq!(args.set_values, ["hdock.angle=10"]);
        assert!(args.result_file.is_none());
    }

    #[test]
    fn bin_dir_and_image_are_exclusive() {
        let result = Cli::try_parse_from([
            "pairdock", "dock", "megadock", "-l", "p", "-i", "i", "-o", "o", "--bin-dir", "/opt",
            "--image", "megadock:gpu",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn merge_sources_are_optional_flags() {
        let cli =
            Cli::try_parse_from(["pairdock", "merge", "--af", "af.tsv", "-o", "merged.tsv"])
                .unwrap();
        let Commands::Merge(args) = cli.command else {
            panic!("expected the merge subcommand");
        };
        assert_eq!(args.alphafold, Some(PathBuf::from("af.tsv")));
        assert!(args.megadock.is_none() && args.hdock.is_none());
        assert!(!args.no_legend);
    }
}
