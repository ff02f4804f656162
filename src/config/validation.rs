//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check collection names and contained types are unique
//! - Compile every rule source and hint table once so syntax errors surface
//!   at load time with their location
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationIssue>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;
use crate::entity::{charset, Hints};
use crate::error::SyntaxError;
use crate::rules::Ruleset;

/// One problem found in a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationIssue {
    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("collection #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("collection '{0}' has no contained type")]
    EmptyContains(String),

    #[error("collection '{0}' is defined more than once")]
    DuplicateName(String),

    #[error("type '{type_name}' is contained by more than one collection ('{collection}')")]
    DuplicateContains {
        type_name: String,
        collection: String,
    },

    #[error("collection '{collection}' entity_transform: {source}")]
    Rules {
        collection: String,
        source: SyntaxError,
    },

    #[error("collection '{collection}' parse_hints: {source}")]
    Hints {
        collection: String,
        source: SyntaxError,
    },
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationIssue {
    ValidationIssue::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Check a configuration, collecting every problem.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(invalid(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        issues.push(invalid("listener.max_body_bytes", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        issues.push(invalid("timeouts.request_secs", "must be greater than 0"));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        issues.push(invalid(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if config.negotiation.charsets.is_empty() {
        issues.push(invalid("negotiation.charsets", "at least one charset is required"));
    }
    for name in &config.negotiation.charsets {
        if charset::canonical(name).is_none() {
            issues.push(invalid(
                "negotiation.charsets",
                format!("unsupported charset '{}'", name),
            ));
        }
    }
    if let Some(public_url) = &config.negotiation.public_url {
        if let Err(err) = url::Url::parse(public_url) {
            issues.push(invalid("negotiation.public_url", err.to_string()));
        }
    }

    let mut names = HashSet::new();
    let mut contained = HashSet::new();
    for (index, spec) in config.collections.iter().enumerate() {
        if spec.name.trim().is_empty() {
            issues.push(ValidationIssue::EmptyName { index });
            continue;
        }
        if !names.insert(spec.name.as_str()) {
            issues.push(ValidationIssue::DuplicateName(spec.name.clone()));
        }
        if spec.contains.trim().is_empty() {
            issues.push(ValidationIssue::EmptyContains(spec.name.clone()));
        } else if !contained.insert(spec.contains.as_str()) {
            issues.push(ValidationIssue::DuplicateContains {
                type_name: spec.contains.clone(),
                collection: spec.name.clone(),
            });
        }
        if let Err(source) = Ruleset::parse(&spec.entity_transform) {
            issues.push(ValidationIssue::Rules {
                collection: spec.name.clone(),
                source,
            });
        }
        if let Err(source) = Hints::parse(&spec.parse_hints) {
            issues.push(ValidationIssue::Hints {
                collection: spec.name.clone(),
                source,
            });
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionSpec;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_all_problems_reported() {
        let mut config = ServiceConfig::default();
        config.timeouts.request_secs = 0;
        config.negotiation.charsets = vec!["koi8-r".into()];
        config.collections = vec![
            CollectionSpec::new("books", "book"),
            CollectionSpec::new("books", "book"),
            CollectionSpec::new("", "tag"),
            CollectionSpec::new("reviews", "review").with_transform("comment <=> frobnicate(Comment)"),
            CollectionSpec::new("authors", "author").with_hints("name: colour=blue"),
        ];

        let issues = validate_config(&config).unwrap_err();
        assert_eq!(issues.len(), 7);
        assert!(issues.contains(&ValidationIssue::DuplicateName("books".into())));
        assert!(issues.contains(&ValidationIssue::EmptyName { index: 2 }));
        assert!(issues
            .iter()
            .any(|issue| matches!(issue, ValidationIssue::Rules { collection, .. } if collection == "reviews")));
        assert!(issues.iter().any(|issue| matches!(
            issue,
            ValidationIssue::Hints { source: SyntaxError::Hint { line: 1, .. }, .. }
        )));
    }
}
