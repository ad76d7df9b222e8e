//! Annotation rule tables.
//!
//! Rules are plain data loaded once per run from `rules.json` (or the built-in
//! catalog defaults) so they can be validated and tested independently of the
//! annotation engine.
use crate::date_range::OpenRangePolicy;
use crate::schema::{RenderStrategy, XSD_STRING};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Current schema version for `rules.json`.
pub const RULES_SCHEMA_VERSION: u32 = 1;

const APP_CONFIG_DIR: &str = "catalog-admin";
const RULES_FILE_NAME: &str = "rules.json";

/// `{entity, field[]}` selector shared by the name-driven tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFields {
    pub entity: String,
    pub fields: Vec<String>,
}

impl EntityFields {
    pub fn new(entity: &str, fields: &[&str]) -> Self {
        Self {
            entity: entity.to_string(),
            fields: fields.iter().map(|field| field.to_string()).collect(),
        }
    }
}

/// Catalog-wide rule keyed by a field's semantic range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRenderRule {
    pub range: String,
    pub strategy: RenderStrategy,
}

/// All rule tables driving the annotator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRules {
    pub schema_version: u32,
    /// Fields edited through the date-range validated input.
    #[serde(default)]
    pub validated_inputs: Vec<EntityFields>,
    #[serde(default)]
    pub render_strategies: Vec<RangeRenderRule>,
    /// Fields edited through the multiline rich-text input.
    #[serde(default)]
    pub rich_inputs: Vec<EntityFields>,
    /// Resource names listed first, in this order.
    #[serde(default)]
    pub ordering: Vec<String>,
    /// Fields hidden from list views.
    #[serde(default)]
    pub list_exclusions: Vec<EntityFields>,
    #[serde(default)]
    pub open_range_policy: OpenRangePolicy,
}

/// Built-in tables for the manuscript catalog.
pub fn default_rules() -> AnnotationRules {
    AnnotationRules {
        schema_version: RULES_SCHEMA_VERSION,
        validated_inputs: vec![
            EntityFields::new("people", &["dateBirth", "dateDeath"]),
            EntityFields::new("manuscripts", &["date"]),
        ],
        render_strategies: vec![RangeRenderRule {
            range: XSD_STRING.to_string(),
            strategy: RenderStrategy::EllipsisText,
        }],
        rich_inputs: Vec::new(),
        ordering: vec!["people".to_string(), "manuscripts".to_string()],
        list_exclusions: Vec::new(),
        open_range_policy: OpenRangePolicy::Strict,
    }
}

/// Render the default tables as pretty JSON.
pub fn rules_stub() -> Result<String> {
    serde_json::to_string_pretty(&default_rules()).context("serialize rules stub")
}

/// Load and validate rule tables from a JSON file.
pub fn load_rules(path: &Path) -> Result<AnnotationRules> {
    let bytes = fs::read(path).with_context(|| format!("read rules {}", path.display()))?;
    let rules: AnnotationRules = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse rules JSON {}", path.display()))?;
    validate_rules(&rules).with_context(|| format!("validate rules {}", path.display()))?;
    Ok(rules)
}

/// Persist rule tables in a stable JSON format.
pub fn write_rules(path: &Path, rules: &AnnotationRules) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create rules dir")?;
    }
    let text = serde_json::to_string_pretty(rules).context("serialize rules")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Check rule tables for structural mistakes.
///
/// Whether names exist in the discovered schema is checked at annotation time.
pub fn validate_rules(rules: &AnnotationRules) -> Result<()> {
    if rules.schema_version != RULES_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported rules schema_version {}",
            rules.schema_version
        ));
    }
    validate_entity_fields(&rules.validated_inputs, "validated_inputs")?;
    validate_entity_fields(&rules.rich_inputs, "rich_inputs")?;
    validate_entity_fields(&rules.list_exclusions, "list_exclusions")?;
    for rule in &rules.render_strategies {
        if rule.range.trim().is_empty() {
            return Err(anyhow!("render_strategies entries need a non-empty range"));
        }
    }
    let mut seen = BTreeSet::new();
    for name in &rules.ordering {
        if name.trim().is_empty() {
            return Err(anyhow!("ordering entries must be non-empty"));
        }
        if !seen.insert(name.as_str()) {
            return Err(anyhow!("ordering lists {name:?} more than once"));
        }
    }
    Ok(())
}

fn validate_entity_fields(entries: &[EntityFields], table: &str) -> Result<()> {
    for entry in entries {
        if entry.entity.trim().is_empty() {
            return Err(anyhow!("{table} entries need a non-empty entity"));
        }
        if entry.fields.iter().any(|field| field.trim().is_empty()) {
            return Err(anyhow!(
                "{table} entry for {:?} has an empty field name",
                entry.entity
            ));
        }
    }
    Ok(())
}

/// Default location of the user's rules file.
pub fn user_rules_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_CONFIG_DIR).join(RULES_FILE_NAME))
}

/// Pick the rules source: explicit path, then the user config file, then defaults.
pub fn resolve_rules(explicit: Option<&Path>) -> Result<AnnotationRules> {
    if let Some(path) = explicit {
        return load_rules(path);
    }
    if let Some(path) = user_rules_path().filter(|path| path.is_file()) {
        tracing::debug!(path = %path.display(), "using user rules file");
        return load_rules(&path);
    }
    Ok(default_rules())
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
