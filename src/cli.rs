//! CLI argument parsing for the catalog admin configuration tool.
//!
//! Commands are thin wrappers around the grammar, rule tables, annotator and
//! discovery modules so the same logic can back the admin frontend.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default catalog API entrypoint.
pub const DEFAULT_ENTRYPOINT: &str = "https://sandbox.cceh.uni-koeln.de";

/// Environment variable holding the bearer token for discovery.
pub const TOKEN_ENV: &str = "CATADMIN_TOKEN";

#[derive(Parser, Debug)]
#[command(
    name = "catadmin",
    version,
    about = "Annotate a Hydra catalog schema for the admin interface",
    after_help = "Examples:\n  catadmin check-date \"1300 <> 1500\" \"~1300\"\n  catadmin rules --stub > rules.json\n  catadmin annotate --schema api.json --rules rules.json --out annotated.json\n  catadmin list --schema api.json\n  catadmin discover --entrypoint https://sandbox.cceh.uni-koeln.de",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    CheckDate(CheckDateArgs),
    Annotate(AnnotateArgs),
    Discover(DiscoverArgs),
    Rules(RulesArgs),
    List(ListArgs),
}

/// Classify date-range expressions.
#[derive(Parser, Debug)]
#[command(about = "Check values against the date-range grammar")]
pub struct CheckDateArgs {
    /// Values to check; an empty string is always accepted
    #[arg(value_name = "VALUE", required = true)]
    pub values: Vec<String>,

    /// Accept ranges with an empty upper bound ("1300 <>")
    #[arg(long)]
    pub allow_open_end: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Annotate a schema file.
#[derive(Parser, Debug)]
#[command(about = "Annotate an API description with the rule tables")]
pub struct AnnotateArgs {
    /// API description JSON (entrypoint, title, resources)
    #[arg(long, value_name = "FILE")]
    pub schema: PathBuf,

    /// Rule tables JSON (defaults to the user config file, then built-ins)
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Output path for the annotated description (stdout when omitted)
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

/// Discover and annotate a live API.
#[derive(Parser, Debug)]
#[command(about = "Fetch a Hydra API description and annotate it")]
pub struct DiscoverArgs {
    /// API entrypoint URL
    #[arg(long, value_name = "URL", default_value = DEFAULT_ENTRYPOINT)]
    pub entrypoint: String,

    /// Rule tables JSON (defaults to the user config file, then built-ins)
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Bearer token (falls back to $CATADMIN_TOKEN)
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Output path for the annotated description (stdout when omitted)
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

/// Print rule tables.
#[derive(Parser, Debug)]
#[command(about = "Print the effective rule tables")]
pub struct RulesArgs {
    /// Print the built-in defaults instead of the effective tables
    #[arg(long, conflicts_with = "rules")]
    pub stub: bool,

    /// Rule tables JSON to validate and print
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,
}

/// Preview list views.
#[derive(Parser, Debug)]
#[command(about = "Preview list-view columns after annotation")]
pub struct ListArgs {
    /// API description JSON (entrypoint, title, resources)
    #[arg(long, value_name = "FILE")]
    pub schema: PathBuf,

    /// Rule tables JSON (defaults to the user config file, then built-ins)
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Sample records JSON keyed by resource name, rendered as list rows
    #[arg(long, value_name = "FILE")]
    pub records: Option<PathBuf>,
}
