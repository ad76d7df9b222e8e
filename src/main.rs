use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use catalog_admin::annotate::{annotate, annotate_discovery, AdminSetup};
use catalog_admin::cli::{
    AnnotateArgs, CheckDateArgs, Command, DiscoverArgs, ListArgs, RootArgs, RulesArgs, TOKEN_ENV,
};
use catalog_admin::date_range::{grammar_for, OpenRangePolicy};
use catalog_admin::display::DisplayContext;
use catalog_admin::hydra::{discover, CredentialProvider, SessionCredentials, UreqTransport};
use catalog_admin::rules;
use catalog_admin::schema::{ApiDescription, ResourceDescription};

const LOG_ENV: &str = "CATADMIN_LOG";
const LOGIN_REQUIRED_EXIT: u8 = 2;

fn main() -> Result<ExitCode> {
    init_tracing();
    let args = RootArgs::parse();

    match args.command {
        Command::CheckDate(args) => cmd_check_date(args),
        Command::Annotate(args) => cmd_annotate(args),
        Command::Discover(args) => cmd_discover(args),
        Command::Rules(args) => cmd_rules(args),
        Command::List(args) => cmd_list(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Serialize)]
struct DateCheck<'a> {
    value: &'a str,
    valid: bool,
    message: Option<&'static str>,
}

fn cmd_check_date(args: CheckDateArgs) -> Result<ExitCode> {
    let policy = if args.allow_open_end {
        OpenRangePolicy::AllowOpenEnd
    } else {
        OpenRangePolicy::Strict
    };
    let grammar = grammar_for(policy);
    let checks: Vec<DateCheck<'_>> = args
        .values
        .iter()
        .map(|value| {
            let verdict = grammar.classify(Some(value.as_str()));
            DateCheck {
                value: value.as_str(),
                valid: verdict.is_valid(),
                message: verdict.message(),
            }
        })
        .collect();

    if args.json {
        let text = serde_json::to_string_pretty(&checks).context("serialize date checks")?;
        println!("{text}");
    } else {
        for check in &checks {
            match check.message {
                None => println!("valid    {:?}", check.value),
                Some(message) => println!("invalid  {:?}: {message}", check.value),
            }
        }
    }

    let rejected = checks.iter().filter(|check| !check.valid).count();
    if rejected > 0 {
        tracing::debug!(rejected, total = checks.len(), "date values rejected");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_annotate(args: AnnotateArgs) -> Result<ExitCode> {
    let api: ApiDescription = read_json(&args.schema)?;
    let rules = rules::resolve_rules(args.rules.as_deref())?;
    let resources = annotate(&api.resources, &rules)
        .with_context(|| format!("annotate {}", args.schema.display()))?;
    let annotated = ApiDescription { resources, ..api };
    write_output(args.out.as_deref(), &annotated)?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_discover(args: DiscoverArgs) -> Result<ExitCode> {
    let rules = rules::resolve_rules(args.rules.as_deref())?;
    let credentials = SessionCredentials::default();
    if let Some(token) = args.token.or_else(|| std::env::var(TOKEN_ENV).ok()) {
        credentials.set_token(token);
    }

    let discovery = discover(&UreqTransport, &credentials, &args.entrypoint)
        .with_context(|| format!("discover {}", args.entrypoint))?;
    match annotate_discovery(discovery, &rules).context("annotate discovered schema")? {
        AdminSetup::Annotated(api) => {
            write_output(args.out.as_deref(), &api)?;
            Ok(ExitCode::SUCCESS)
        }
        AdminSetup::RedirectToLogin { route, .. } => {
            eprintln!(
                "Authorization required by {}; redirect to {route} and retry with --token or ${TOKEN_ENV}.",
                args.entrypoint
            );
            Ok(ExitCode::from(LOGIN_REQUIRED_EXIT))
        }
    }
}

fn cmd_rules(args: RulesArgs) -> Result<ExitCode> {
    if args.stub {
        println!("{}", rules::rules_stub()?);
        return Ok(ExitCode::SUCCESS);
    }
    let rules = rules::resolve_rules(args.rules.as_deref())?;
    let text = serde_json::to_string_pretty(&rules).context("serialize rules")?;
    println!("{text}");
    Ok(ExitCode::SUCCESS)
}

type Record = BTreeMap<String, serde_json::Value>;

/// Sample records keyed by resource name, used to preview list cells.
type SampleRecords = BTreeMap<String, Vec<Record>>;

fn cmd_list(args: ListArgs) -> Result<ExitCode> {
    let api: ApiDescription = read_json(&args.schema)?;
    let rules = rules::resolve_rules(args.rules.as_deref())?;
    let resources = annotate(&api.resources, &rules)
        .with_context(|| format!("annotate {}", args.schema.display()))?;
    let samples: SampleRecords = match &args.records {
        Some(path) => read_json(path)?,
        None => SampleRecords::new(),
    };

    for resource in &resources {
        print_list_view(resource, samples.get(&resource.name).map(Vec::as_slice));
    }
    Ok(ExitCode::SUCCESS)
}

fn print_list_view(resource: &ResourceDescription, records: Option<&[Record]>) {
    println!("{}", resource.name);
    let columns: Vec<_> = resource.fields.iter().filter(|f| f.list_visible).collect();
    for field in &columns {
        let render = field
            .render_override
            .map(|strategy| strategy.as_str())
            .unwrap_or("default");
        let mut line = format!("  {:<20} render={render}", field.name);
        if let Some(input) = field.input_override {
            line.push_str(&format!(" input={:?}", input.kind));
            if input.validator.is_some() {
                line.push_str(" validated");
            }
        }
        println!("{line}");
    }
    for record in records.into_iter().flatten() {
        let cells: Vec<String> = columns
            .iter()
            .map(|field| {
                let raw = match record.get(&field.name) {
                    Some(serde_json::Value::String(text)) => text.clone(),
                    Some(serde_json::Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                match field.render_override {
                    Some(strategy) => strategy
                        .display(&raw, &field.name, DisplayContext::ListCell)
                        .into_owned(),
                    None => raw,
                }
            })
            .collect();
        println!("  | {}", cells.join(" | "));
    }
}

fn write_output<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    match path {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote annotated schema");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value =
        serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))?;
    Ok(value)
}
