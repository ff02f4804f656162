//! Ordered rule collections and their application to resources.

use std::collections::BTreeMap;

use crate::error::{SyntaxError, ValidationError};
use crate::resource::{Resource, Value, TYPE_KEY};
use crate::rules::parser::{FieldSpec, Rule};

/// Relaxations used when probing a ruleset rather than validating input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Do not reject keys no rule consumes.
    pub ignore_unknown: bool,
    /// Do not reject absent mandatory fields.
    pub ignore_missing: bool,
}

impl ProcessOptions {
    /// Accept anything; used to find out what a ruleset does to a type.
    pub const LENIENT: ProcessOptions = ProcessOptions {
        ignore_unknown: true,
        ignore_missing: true,
    };
}

/// The field-mapping rules of one collection. Immutable once parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ruleset {
    rules: Vec<Rule>,
}

impl Ruleset {
    /// Parse a multi-line rule source: one rule per line, blank lines and
    /// lines starting with `#` are skipped.
    pub fn parse(source: &str) -> Result<Self, SyntaxError> {
        let mut rules = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            rules.push(Rule::parse_at(line, index + 1)?);
        }
        Ok(Self { rules })
    }

    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Map external field names to internal ones.
    pub fn process(&self, input: Resource) -> Result<Resource, ValidationError> {
        self.apply(input, false, ProcessOptions::default())
    }

    /// Map internal field names back to external ones.
    pub fn process_reverse(&self, output: Resource) -> Result<Resource, ValidationError> {
        self.apply(output, true, ProcessOptions::default())
    }

    pub fn process_with(
        &self,
        input: Resource,
        options: ProcessOptions,
    ) -> Result<Resource, ValidationError> {
        self.apply(input, false, options)
    }

    pub fn process_reverse_with(
        &self,
        output: Resource,
        options: ProcessOptions,
    ) -> Result<Resource, ValidationError> {
        self.apply(output, true, options)
    }

    /// The type name `process` gives a resource of type `external`.
    pub fn probe_type(&self, external: &str) -> String {
        self.apply(Resource::new(external), false, ProcessOptions::LENIENT)
            .map(|r| r.type_name().to_string())
            .unwrap_or_else(|_| external.to_string())
    }

    fn apply(
        &self,
        input: Resource,
        reverse: bool,
        options: ProcessOptions,
    ) -> Result<Resource, ValidationError> {
        let (type_name, fields) = input.into_parts();
        let mut out_type = None;
        let mut out = BTreeMap::new();

        for rule in &self.rules {
            let applies = if reverse {
                rule.direction.includes_reverse()
            } else {
                rule.direction.includes_forward()
            };
            if !applies {
                continue;
            }
            let (source, target) = sides(rule, reverse);

            let value = if source.name == TYPE_KEY {
                Some(Value::String(type_name.clone()))
            } else {
                fields.get(&source.name).cloned()
            };
            let Some(value) = value else {
                if rule.mandatory && !options.ignore_missing {
                    return Err(ValidationError::Missing(source.name.clone()));
                }
                continue;
            };

            let value = convert(source, value)?;
            if target.name == TYPE_KEY {
                match value {
                    Value::String(s) => out_type = Some(s),
                    other => {
                        return Err(ValidationError::Conversion {
                            field: source.name.clone(),
                            function: "!type",
                            reason: format!("type must be a string, got {}", other.kind()),
                        })
                    }
                }
            } else {
                out.insert(target.name.clone(), value);
            }
        }

        if !options.ignore_unknown {
            for key in fields.keys() {
                let known = self.rules.iter().any(|rule| sides(rule, reverse).0.name == *key);
                if !known {
                    return Err(ValidationError::Unknown(key.clone()));
                }
            }
        }

        Ok(Resource::from_fields(out_type.unwrap_or(type_name), out))
    }
}

fn sides(rule: &Rule, reverse: bool) -> (&FieldSpec, &FieldSpec) {
    if reverse {
        (&rule.right, &rule.left)
    } else {
        (&rule.left, &rule.right)
    }
}

fn convert(source: &FieldSpec, mut value: Value) -> Result<Value, ValidationError> {
    for function in &source.transforms {
        value = function
            .apply(value)
            .map_err(|reason| ValidationError::Conversion {
                field: source.name.clone(),
                function: function.name(),
                reason,
            })?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK_RULES: &str = "
        # type names are capitalized internally
        title(!type) <=> lower(!type)
        title <=> Title *
        int(year) <=> str(Year)
        author <=> Author
        id <= Id
    ";

    fn ruleset() -> Ruleset {
        Ruleset::parse(BOOK_RULES).unwrap()
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        assert_eq!(ruleset().rules().len(), 5);
    }

    #[test]
    fn test_parse_error_reports_source_line() {
        let err = Ruleset::parse("a <=> b\n\n  c <=> (d)").unwrap_err();
        assert_eq!(
            err,
            SyntaxError::Rule {
                line: 3,
                column: 9,
                message: "expecting field name, found '('".into()
            }
        );
    }

    #[test]
    fn test_forward_then_reverse_is_identity() {
        let external = Resource::new("book")
            .with("title", "Dune")
            .with("year", "1965")
            .with("author", "Frank Herbert");

        let internal = ruleset().process(external.clone()).unwrap();
        assert_eq!(internal.type_name(), "Book");
        assert_eq!(internal.get("Year"), Some(&Value::Int(1965)));
        assert_eq!(internal.get("Title"), Some(&Value::from("Dune")));

        let back = ruleset().process_reverse(internal).unwrap();
        assert_eq!(back, external);
    }

    #[test]
    fn test_reverse_only_rule() {
        let internal = Resource::new("Book").with("Title", "Dune").with("Id", "7");
        let external = ruleset().process_reverse(internal).unwrap();
        assert_eq!(external.get("id"), Some(&Value::from("7")));

        let err = ruleset()
            .process(Resource::new("book").with("title", "x").with("Id", "7"))
            .unwrap_err();
        assert_eq!(err, ValidationError::Unknown("Id".into()));
    }

    #[test]
    fn test_mandatory_enforcement() {
        let err = ruleset().process(Resource::new("book")).unwrap_err();
        assert_eq!(err, ValidationError::Missing("title".into()));

        let relaxed = Ruleset::parse("title <=> Title").unwrap();
        let out = relaxed.process(Resource::new("book")).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_field_rejection() {
        let rules = Ruleset::parse("title <=> Title").unwrap();
        let input = Resource::new("book").with("unrelated", 1i64);
        assert_eq!(
            rules.process(input.clone()).unwrap_err(),
            ValidationError::Unknown("unrelated".into())
        );

        let options = ProcessOptions {
            ignore_unknown: true,
            ..Default::default()
        };
        assert!(rules.process_with(input, options).unwrap().is_empty());
    }

    #[test]
    fn test_type_passes_through_without_type_rule() {
        let rules = Ruleset::parse("title <=> Title").unwrap();
        let out = rules.process(Resource::new("book").with("title", "x")).unwrap();
        assert_eq!(out.type_name(), "book");
    }

    #[test]
    fn test_conversion_failure() {
        let err = ruleset()
            .process(Resource::new("book").with("title", "x").with("year", "soon"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Conversion { function: "int", .. }));
    }

    #[test]
    fn test_probe_type() {
        assert_eq!(ruleset().probe_type("book"), "Book");
        assert_eq!(Ruleset::default().probe_type("book"), "book");
    }
}
