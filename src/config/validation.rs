//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] against the
//! compiled-in operation table: every declared group and operation must
//! exist, ids must not repeat, the advice group must be a known group and
//! the rejection status must be a 4xx or 5xx code. Returns a list of
//! [`ValidationError`] values with per-field suggestions.

use std::collections::{BTreeSet, HashSet};

use super::model::Config;
use crate::error::ValidationError;
use crate::handlers;
use crate::registry::{Marker, Operation};

fn known_groups(operations: &[Operation]) -> BTreeSet<&'static str> {
    operations.iter().map(|o| o.id.group).collect()
}

fn known_operations(operations: &[Operation], group: &str) -> BTreeSet<&'static str> {
    operations
        .iter()
        .filter(|o| o.id.group == group)
        .map(|o| o.id.operation)
        .collect()
}

fn one_of(names: &BTreeSet<&'static str>) -> String {
    let list: Vec<&str> = names.iter().copied().collect();
    format!("expected one of: {}", list.join(", "))
}

/// Validate a rejection status code. Returns `Ok(())` or a human-readable error.
pub fn validate_reject_status(status: u16) -> Result<(), String> {
    if (400..=599).contains(&status) {
        Ok(())
    } else {
        Err(format!("{status} is not a 4xx or 5xx status code"))
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    validate_against(config, &handlers::operations())
}

pub fn validate_against(
    config: &Config,
    operations: &[Operation],
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let groups = known_groups(operations);

    if let Err(msg) = validate_reject_status(config.gate.reject_status) {
        errors.push(ValidationError {
            location: "(root)".into(),
            field: "gate.reject_status".into(),
            message: msg,
            suggestion: Some("use 403 (forbidden) or 404 (not found)".into()),
        });
    }

    if let Some(ref group) = config.advice.group {
        if !groups.contains(group.as_str()) {
            errors.push(ValidationError {
                location: "(root)".into(),
                field: "advice.group".into(),
                message: format!("unknown handler group '{group}'"),
                suggestion: Some(one_of(&groups)),
            });
        }
    }

    if config.groups.is_empty() {
        errors.push(ValidationError {
            location: "(root)".into(),
            field: "groups".into(),
            message: "at least one handler group must be declared".into(),
            suggestion: None,
        });
        return Err(errors);
    }

    let mut seen_groups = HashSet::new();

    for (i, group) in config.groups.iter().enumerate() {
        let group_id = if group.id.is_empty() {
            format!("groups[{i}]")
        } else {
            group.id.clone()
        };

        if !seen_groups.insert(&group.id) {
            errors.push(ValidationError {
                location: group_id.clone(),
                field: "id".into(),
                message: "duplicate group id".into(),
                suggestion: None,
            });
        }

        if !groups.contains(group.id.as_str()) {
            errors.push(ValidationError {
                location: group_id,
                field: "id".into(),
                message: format!("unknown handler group '{}'", group.id),
                suggestion: Some(one_of(&groups)),
            });
            continue;
        }

        let ops = known_operations(operations, &group.id);
        let mut seen_ops = HashSet::new();

        for op in &group.operations {
            let location = format!("{}.{}", group.id, op.id);
            if !seen_ops.insert(&op.id) {
                errors.push(ValidationError {
                    location: location.clone(),
                    field: "id".into(),
                    message: "duplicate operation id".into(),
                    suggestion: None,
                });
            }
            if !ops.contains(op.id.as_str()) {
                errors.push(ValidationError {
                    location,
                    field: "id".into(),
                    message: format!("unknown operation '{}'", op.id),
                    suggestion: Some(one_of(&ops)),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn marker_list(markers: &[Marker]) -> String {
    if markers.is_empty() {
        "none".into()
    } else {
        markers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let mut lines = vec![format!(
        "  {} groups, {} operations\n",
        config.groups.len(),
        config.total_operations()
    )];

    lines.push(format!(
        "  gate: {} (reject {})",
        if config.gate.enabled { "on" } else { "off" },
        config.gate.reject_status
    ));
    lines.push(format!(
        "  capture: {}",
        if config.capture.enabled { "on" } else { "off" }
    ));
    lines.push(format!(
        "  advice: {}\n",
        config.advice.group.as_deref().unwrap_or("off")
    ));

    for group in &config.groups {
        lines.push(format!(
            "  {}  -> {} operations (markers: {})",
            group.id,
            group.operations.len(),
            marker_list(&group.markers)
        ));
        for op in &group.operations {
            lines.push(format!("    {}: {}", op.id, marker_list(&op.markers)));
        }
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}
