//! Schema annotation pipeline.
//!
//! Takes the resources produced by discovery and attaches presentation
//! overrides driven by [`AnnotationRules`]. The pipeline is a pure
//! copy-and-annotate pass: the input graph is never mutated and running it on
//! its own output yields the same graph.
//!
//! ## Application order
//! 1. Validated (date-range) inputs.
//! 2. Rich-text inputs. A field named by both tables ends up rich-text.
//! 3. Render strategies keyed by field range, across every resource.
//! 4. List visibility.
//! 5. Resource ordering.
//!
//! Any rule naming a resource or field missing from the schema rejects the
//! whole pass. Such a rule means the tables drifted from the remote schema.
use crate::hydra::Discovery;
use crate::rules::{AnnotationRules, EntityFields, RangeRenderRule};
use crate::schema::{ApiDescription, FieldDescription, InputStrategy, ResourceDescription};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Route the admin redirects to when discovery requires authentication.
pub const LOGIN_ROUTE: &str = "/login";

/// A rule table that disagrees with the discovered schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotateError {
    #[error("{table} rule references unknown resource {entity:?}")]
    UnknownResource { table: RuleTable, entity: String },
    #[error("{table} rule references unknown field {field:?} on resource {entity:?}")]
    UnknownField {
        table: RuleTable,
        entity: String,
        field: String,
    },
}

/// Names of the rule tables, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTable {
    ValidatedInputs,
    RichInputs,
    Ordering,
    ListExclusions,
}

impl RuleTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleTable::ValidatedInputs => "validated_inputs",
            RuleTable::RichInputs => "rich_inputs",
            RuleTable::Ordering => "ordering",
            RuleTable::ListExclusions => "list_exclusions",
        }
    }
}

impl std::fmt::Display for RuleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the admin should render once discovery and annotation are done.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminSetup {
    Annotated(ApiDescription),
    /// Discovery was refused; whatever was discovered is passed through as-is.
    RedirectToLogin {
        route: &'static str,
        api: Option<ApiDescription>,
    },
}

/// Annotate a discovery outcome, passing authorization failures through.
pub fn annotate_discovery(
    discovery: Discovery,
    rules: &AnnotationRules,
) -> Result<AdminSetup, AnnotateError> {
    match discovery {
        Discovery::Api(api) => {
            let resources = annotate(&api.resources, rules)?;
            Ok(AdminSetup::Annotated(ApiDescription { resources, ..api }))
        }
        Discovery::LoginRequired { api } => {
            tracing::warn!("schema discovery requires login; skipping annotation");
            Ok(AdminSetup::RedirectToLogin {
                route: LOGIN_ROUTE,
                api,
            })
        }
    }
}

/// Return an annotated copy of `resources`.
pub fn annotate(
    resources: &[ResourceDescription],
    rules: &AnnotationRules,
) -> Result<Vec<ResourceDescription>, AnnotateError> {
    let mut annotated = resources.to_vec();
    apply_validated_input_rules(&mut annotated, rules)?;
    apply_rich_input_rules(&mut annotated, &rules.rich_inputs)?;
    let rendered = apply_render_strategy_rules(&mut annotated, &rules.render_strategies);
    let visibility = ListVisibility::from_table(&annotated, &rules.list_exclusions)?;
    visibility.apply(&mut annotated);
    order_resources(&mut annotated, &rules.ordering)?;
    tracing::info!(
        resources = annotated.len(),
        rendered,
        hidden = visibility.hidden_count(),
        "schema annotated"
    );
    Ok(annotated)
}

/// Attach the date-range validated input to every field the table names.
pub fn apply_validated_input_rules(
    resources: &mut [ResourceDescription],
    rules: &AnnotationRules,
) -> Result<(), AnnotateError> {
    let strategy = InputStrategy::date_range(rules.open_range_policy);
    apply_input_rules(
        resources,
        &rules.validated_inputs,
        RuleTable::ValidatedInputs,
        strategy,
    )
}

/// Attach the multiline rich-text input to every field the table names.
pub fn apply_rich_input_rules(
    resources: &mut [ResourceDescription],
    rules: &[EntityFields],
) -> Result<(), AnnotateError> {
    apply_input_rules(
        resources,
        rules,
        RuleTable::RichInputs,
        InputStrategy::rich_text(),
    )
}

fn apply_input_rules(
    resources: &mut [ResourceDescription],
    rules: &[EntityFields],
    table: RuleTable,
    strategy: InputStrategy,
) -> Result<(), AnnotateError> {
    // Resolve every name first so a defect leaves the graph untouched.
    let index = ResourceIndex::new(resources);
    let mut targets = Vec::new();
    for rule in rules {
        let resource_idx = index.resource(&rule.entity, table)?;
        for field in &rule.fields {
            let field_idx = index.field(resource_idx, &rule.entity, field, table)?;
            targets.push((resource_idx, field_idx));
        }
    }
    for (resource_idx, field_idx) in targets {
        let resource = &mut resources[resource_idx];
        let field = &mut resource.fields[field_idx];
        tracing::debug!(
            table = %table,
            resource = %resource.name,
            field = %field.name,
            "input override"
        );
        field.input_override = Some(strategy);
    }
    Ok(())
}

/// Attach render strategies by field range. Returns the number of fields touched.
///
/// Later rules for the same range win.
pub fn apply_render_strategy_rules(
    resources: &mut [ResourceDescription],
    rules: &[RangeRenderRule],
) -> usize {
    let by_range: BTreeMap<&str, _> = rules
        .iter()
        .map(|rule| (rule.range.as_str(), rule.strategy))
        .collect();
    let mut touched = 0;
    for resource in resources.iter_mut() {
        for field in &mut resource.fields {
            let strategy = field
                .range
                .as_deref()
                .and_then(|range| by_range.get(range));
            if let Some(strategy) = strategy {
                field.render_override = Some(*strategy);
                touched += 1;
            }
        }
    }
    touched
}

/// Sort resources: listed names first in list order, the rest by name.
pub fn order_resources(
    resources: &mut [ResourceDescription],
    ordering: &[String],
) -> Result<(), AnnotateError> {
    let names: BTreeSet<&str> = resources.iter().map(|r| r.name.as_str()).collect();
    if let Some(missing) = ordering.iter().find(|name| !names.contains(name.as_str())) {
        return Err(AnnotateError::UnknownResource {
            table: RuleTable::Ordering,
            entity: missing.clone(),
        });
    }
    let positions = ordering_positions(ordering);
    resources.sort_by(|a, b| compare_resources(&a.name, &b.name, &positions));
    Ok(())
}

/// Map each listed name to its first position in the ordering list.
pub fn ordering_positions(ordering: &[String]) -> BTreeMap<&str, usize> {
    let mut positions = BTreeMap::new();
    for (idx, name) in ordering.iter().enumerate() {
        positions.entry(name.as_str()).or_insert(idx);
    }
    positions
}

/// Strict three-way comparison of resource names under an ordering list.
pub fn compare_resources(a: &str, b: &str, positions: &BTreeMap<&str, usize>) -> Ordering {
    match (positions.get(a), positions.get(b)) {
        (Some(left), Some(right)) => left.cmp(right).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// List-view visibility filter built from the exclusion table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListVisibility {
    hidden: BTreeMap<String, BTreeSet<String>>,
}

impl ListVisibility {
    /// Build the filter, rejecting exclusions that name unknown resources or fields.
    pub fn from_table(
        resources: &[ResourceDescription],
        exclusions: &[EntityFields],
    ) -> Result<Self, AnnotateError> {
        let index = ResourceIndex::new(resources);
        let mut hidden: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for entry in exclusions {
            let resource_idx = index.resource(&entry.entity, RuleTable::ListExclusions)?;
            for field in &entry.fields {
                index.field(resource_idx, &entry.entity, field, RuleTable::ListExclusions)?;
                hidden
                    .entry(entry.entity.clone())
                    .or_default()
                    .insert(field.clone());
            }
        }
        Ok(Self { hidden })
    }

    /// False only for fields the exclusion table names on that resource.
    pub fn is_visible(&self, resource: &str, field: &str) -> bool {
        !self
            .hidden
            .get(resource)
            .is_some_and(|fields| fields.contains(field))
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.values().map(BTreeSet::len).sum()
    }

    /// Write the filter's answer into each field's `list_visible` flag.
    pub fn apply(&self, resources: &mut [ResourceDescription]) {
        for resource in resources.iter_mut() {
            for field in &mut resource.fields {
                field.list_visible = self.is_visible(&resource.name, &field.name);
            }
        }
    }

    /// Fields of `resource` shown in its list view, in schema order.
    pub fn visible_fields<'a>(
        &'a self,
        resource: &'a ResourceDescription,
    ) -> impl Iterator<Item = &'a FieldDescription> + 'a {
        resource
            .fields
            .iter()
            .filter(move |field| self.is_visible(&resource.name, &field.name))
    }
}

/// Name-indexed lookup over a resource slice.
struct ResourceIndex<'a> {
    resources: &'a [ResourceDescription],
    by_name: BTreeMap<&'a str, usize>,
}

impl<'a> ResourceIndex<'a> {
    fn new(resources: &'a [ResourceDescription]) -> Self {
        let by_name = resources
            .iter()
            .enumerate()
            .map(|(idx, resource)| (resource.name.as_str(), idx))
            .collect();
        Self { resources, by_name }
    }

    fn resource(&self, entity: &str, table: RuleTable) -> Result<usize, AnnotateError> {
        self.by_name
            .get(entity)
            .copied()
            .ok_or_else(|| AnnotateError::UnknownResource {
                table,
                entity: entity.to_string(),
            })
    }

    fn field(
        &self,
        resource_idx: usize,
        entity: &str,
        field: &str,
        table: RuleTable,
    ) -> Result<usize, AnnotateError> {
        self.resources[resource_idx]
            .fields
            .iter()
            .position(|candidate| candidate.name == field)
            .ok_or_else(|| AnnotateError::UnknownField {
                table,
                entity: entity.to_string(),
                field: field.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "annotate_tests.rs"]
mod tests;
