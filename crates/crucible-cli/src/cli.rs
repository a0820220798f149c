use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The Crucible Developers",
    version,
    about = "Crucible CLI - A command-line interface for rule-based atom typing and bonded-parameter assignment in molecular force fields.",
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
    /// Type a structure against one or more rule files and resolve its bonded terms.
    Apply(ApplyArgs),
    /// Load rule files and report their contents without typing anything.
    Inspect(InspectArgs),
}

/// Arguments for the `apply` subcommand.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the input structure description in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Rule file(s) to load, in precedence order. May be given multiple times.
    #[arg(short, long = "forcefield", required = true, value_name = "PATH")]
    pub forcefields: Vec<PathBuf>,

    /// Write the rule subset actually used by this structure to a file.
    #[arg(short, long = "output-rules", value_name = "PATH")]
    pub output_rules: Option<PathBuf>,

    /// Write a BibTeX bibliography of the used atom types to a file.
    #[arg(long, value_name = "PATH")]
    pub references_file: Option<PathBuf>,

    /// Only (re)type residues with these names.
    #[arg(long, value_name = "NAME", num_args(1..))]
    pub residues: Option<Vec<String>>,

    /// Disable residue-template memoization; type every atom individually.
    #[arg(long)]
    pub no_residue_map: bool,

    /// Warn instead of failing when a bond has no parameters.
    #[arg(long)]
    pub allow_missing_bond_params: bool,

    /// Warn instead of failing when an angle has no parameters.
    #[arg(long)]
    pub allow_missing_angle_params: bool,

    /// Warn instead of failing when a proper dihedral has no parameters.
    #[arg(long)]
    pub allow_missing_dihedral_params: bool,

    /// Warn instead of failing when an improper dihedral has no parameters.
    #[arg(long)]
    pub allow_missing_improper_params: bool,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Rule file(s) to load, in precedence order. May be given multiple times.
    #[arg(short, long = "forcefield", required = true, value_name = "PATH")]
    pub forcefields: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn apply_parses_multiple_forcefields_and_flags() {
        let cli = Cli::parse_from([
            "crucible",
            "apply",
            "-i",
            "ethane.toml",
            "-f",
            "oplsaa.xml",
            "-f",
            "extra.xml",
            "--residues",
            "ETH",
            "--no-residue-map",
            "--allow-missing-dihedral-params",
        ]);
        match cli.command {
            Commands::Apply(args) => {
                assert_eq!(args.forcefields.len(), 2);
                assert_eq!(args.residues, Some(vec!["ETH".to_string()]));
                assert!(args.no_residue_map);
                assert!(args.allow_missing_dihedral_params);
                assert!(!args.allow_missing_bond_params);
            }
            _ => panic!("expected apply subcommand"),
        }
    }
}
