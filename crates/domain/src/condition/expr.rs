//! Condition expressions - boolean rules over property field values
//!
//! An expression is a recursive tree of `And`/`Or` combinators over
//! `Is`/`IsNot` field comparisons. The sum type makes "exactly one
//! operation per node" structural instead of a runtime check.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::is_blank;
use crate::condition::properties::{PropertyField, PropertyValues};
use crate::error::DomainError;
use crate::ids::PropertyFieldId;

/// Maximum nesting depth allowed for and/or combinators.
///
/// Validation rejects deeper trees at condition-creation time; the
/// evaluator additionally clamps at this depth so that unvalidated
/// input can never cause unbounded recursion.
pub const MAX_CONDITION_DEPTH: usize = 8;

/// A leaf comparison of a property field against a literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub field_id: PropertyFieldId,
    pub value: Value,
}

impl Comparison {
    pub fn new(field_id: PropertyFieldId, value: Value) -> Self {
        Self { field_id, value }
    }

    /// Trims whitespace from a string literal.
    pub fn sanitize(&mut self) {
        if let Value::String(s) = &mut self.value {
            *s = s.trim().to_string();
        }
    }
}

/// A boolean expression over a run's property values.
///
/// Wire format is externally tagged, matching the existing API
/// contract: `{"and": [...]}`, `{"or": [...]}`,
/// `{"is": {"field_id": ..., "value": ...}}`, `{"isNot": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionExpr {
    /// True iff all children are true. Empty lists are invalid input.
    And(Vec<ConditionExpr>),
    /// True iff any child is true. Empty lists are invalid input.
    Or(Vec<ConditionExpr>),
    /// True iff the field has a value structurally equal to the literal.
    Is(Comparison),
    /// The negation of `Is`; a missing value satisfies it.
    IsNot(Comparison),
}

impl ConditionExpr {
    /// Convenience constructor for an `Is` leaf.
    pub fn is(field_id: PropertyFieldId, value: Value) -> Self {
        Self::Is(Comparison::new(field_id, value))
    }

    /// Convenience constructor for an `IsNot` leaf.
    pub fn is_not(field_id: PropertyFieldId, value: Value) -> Self {
        Self::IsNot(Comparison::new(field_id, value))
    }

    /// Evaluates the expression against the run's property values.
    ///
    /// Pure and safe to call concurrently. Missing values make `Is`
    /// false and `IsNot` true; they are never an error. Combinators
    /// nested beyond [`MAX_CONDITION_DEPTH`] stop recursing and yield
    /// their vacuous value (`And` true, `Or` false), as do empty child
    /// lists that slipped past validation.
    pub fn evaluate(&self, values: &PropertyValues) -> bool {
        self.evaluate_at(0, values)
    }

    fn evaluate_at(&self, depth: usize, values: &PropertyValues) -> bool {
        match self {
            ConditionExpr::And(children) => {
                if depth >= MAX_CONDITION_DEPTH {
                    return true;
                }
                children.iter().all(|c| c.evaluate_at(depth + 1, values))
            }
            ConditionExpr::Or(children) => {
                if depth >= MAX_CONDITION_DEPTH {
                    return false;
                }
                children.iter().any(|c| c.evaluate_at(depth + 1, values))
            }
            ConditionExpr::Is(cmp) => match values.get(cmp.field_id) {
                Some(current) => *current == cmp.value,
                None => false,
            },
            ConditionExpr::IsNot(cmp) => match values.get(cmp.field_id) {
                Some(current) => *current != cmp.value,
                None => true,
            },
        }
    }

    /// Ensures the expression is structurally valid: no empty
    /// combinator lists, no nesting beyond [`MAX_CONDITION_DEPTH`].
    pub fn validate(&self) -> Result<(), DomainError> {
        self.validate_at(0)
    }

    fn validate_at(&self, depth: usize) -> Result<(), DomainError> {
        match self {
            ConditionExpr::And(children) | ConditionExpr::Or(children) => {
                if children.is_empty() {
                    return Err(DomainError::invalid_argument(
                        "and/or condition must have at least one nested condition",
                    ));
                }
                if depth >= MAX_CONDITION_DEPTH {
                    return Err(DomainError::invalid_argument(format!(
                        "condition nesting depth exceeds maximum allowed ({})",
                        MAX_CONDITION_DEPTH
                    )));
                }
                for child in children {
                    child.validate_at(depth + 1)?;
                }
                Ok(())
            }
            ConditionExpr::Is(_) | ConditionExpr::IsNot(_) => Ok(()),
        }
    }

    /// Returns every property field the expression references.
    ///
    /// Drives the targeted re-evaluation fan-out when property values
    /// change: only items whose condition mentions a changed field are
    /// reconciled.
    pub fn field_ids(&self) -> HashSet<PropertyFieldId> {
        let mut set = HashSet::new();
        self.collect_field_ids(&mut set);
        set
    }

    fn collect_field_ids(&self, set: &mut HashSet<PropertyFieldId>) {
        match self {
            ConditionExpr::And(children) | ConditionExpr::Or(children) => {
                for child in children {
                    child.collect_field_ids(set);
                }
            }
            ConditionExpr::Is(cmp) | ConditionExpr::IsNot(cmp) => {
                set.insert(cmp.field_id);
            }
        }
    }

    /// True if the expression references any of the given fields.
    /// An empty slice means "any field at all".
    pub fn references_any(&self, changed: &[PropertyFieldId]) -> bool {
        if changed.is_empty() {
            return true;
        }
        let referenced = self.field_ids();
        changed.iter().any(|f| referenced.contains(f))
    }

    /// Trims whitespace from every string literal in the tree.
    pub fn sanitize(&mut self) {
        match self {
            ConditionExpr::And(children) | ConditionExpr::Or(children) => {
                for child in children {
                    child.sanitize();
                }
            }
            ConditionExpr::Is(cmp) | ConditionExpr::IsNot(cmp) => cmp.sanitize(),
        }
    }

    /// Renders the expression as human-readable text, e.g.
    /// `"Severity" is "critical" AND "Acknowledged" is not true`.
    ///
    /// Unknown fields fall back to their raw ID. Used for timeline and
    /// notification copy by the layers above the engine.
    pub fn describe(&self, fields: &[PropertyField]) -> String {
        match self {
            ConditionExpr::And(children) => Self::describe_children(children, " AND ", fields),
            ConditionExpr::Or(children) => Self::describe_children(children, " OR ", fields),
            ConditionExpr::Is(cmp) => {
                format!("\"{}\" is {}", field_name(cmp.field_id, fields), cmp.value)
            }
            ConditionExpr::IsNot(cmp) => {
                format!(
                    "\"{}\" is not {}",
                    field_name(cmp.field_id, fields),
                    cmp.value
                )
            }
        }
    }

    fn describe_children(
        children: &[ConditionExpr],
        separator: &str,
        fields: &[PropertyField],
    ) -> String {
        children
            .iter()
            .map(|child| match child {
                // Parenthesize nested combinators to keep precedence readable
                ConditionExpr::And(_) | ConditionExpr::Or(_) => {
                    format!("({})", child.describe(fields))
                }
                _ => child.describe(fields),
            })
            .collect::<Vec<_>>()
            .join(separator)
    }
}

fn field_name(field_id: PropertyFieldId, fields: &[PropertyField]) -> String {
    fields
        .iter()
        .find(|f| f.id == field_id)
        .map(|f| f.name.clone())
        .unwrap_or_else(|| field_id.to_string())
}

/// Validates a field ID string from the wire before it becomes a
/// comparison. Kept separate from `Comparison` so transports can check
/// early.
pub fn validate_field_reference(raw: &str) -> Result<(), DomainError> {
    if is_blank(raw) {
        return Err(DomainError::invalid_argument("field_id cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values_with(pairs: &[(PropertyFieldId, Value)]) -> PropertyValues {
        pairs.iter().cloned().collect()
    }

    mod evaluate {
        use super::*;

        #[test]
        fn is_matches_equal_value() {
            let field = PropertyFieldId::new();
            let values = values_with(&[(field, json!("critical"))]);

            assert!(ConditionExpr::is(field, json!("critical")).evaluate(&values));
            assert!(!ConditionExpr::is(field, json!("low")).evaluate(&values));
        }

        #[test]
        fn is_compares_structurally() {
            let field = PropertyFieldId::new();
            let values = values_with(&[(field, json!(["a", "b"]))]);

            assert!(ConditionExpr::is(field, json!(["a", "b"])).evaluate(&values));
            // Order matters for structural equality
            assert!(!ConditionExpr::is(field, json!(["b", "a"])).evaluate(&values));
        }

        #[test]
        fn missing_field_is_false_for_is() {
            let values = PropertyValues::new();
            assert!(!ConditionExpr::is(PropertyFieldId::new(), json!(true)).evaluate(&values));
        }

        #[test]
        fn missing_field_is_true_for_is_not() {
            let values = PropertyValues::new();
            assert!(ConditionExpr::is_not(PropertyFieldId::new(), json!(true)).evaluate(&values));
        }

        #[test]
        fn null_value_counts_as_missing() {
            let field = PropertyFieldId::new();
            let values = values_with(&[(field, Value::Null)]);

            assert!(!ConditionExpr::is(field, json!("x")).evaluate(&values));
            assert!(ConditionExpr::is_not(field, json!("x")).evaluate(&values));
        }

        #[test]
        fn is_not_negates_is() {
            let field = PropertyFieldId::new();
            let values = values_with(&[(field, json!(42))]);

            assert!(!ConditionExpr::is_not(field, json!(42)).evaluate(&values));
            assert!(ConditionExpr::is_not(field, json!(7)).evaluate(&values));
        }

        #[test]
        fn and_or_match_reference_over_all_permutations() {
            // Permutation sweep: three independent boolean inputs,
            // all 2^3 combinations, checked against a naive
            // all()/any() reference.
            let fields = [
                PropertyFieldId::new(),
                PropertyFieldId::new(),
                PropertyFieldId::new(),
            ];

            for mask in 0..8u8 {
                let bits = [mask & 1 != 0, mask & 2 != 0, mask & 4 != 0];
                let values: PropertyValues = fields
                    .iter()
                    .zip(bits)
                    .map(|(f, b)| (*f, json!(b)))
                    .collect();

                let leaves: Vec<ConditionExpr> = fields
                    .iter()
                    .map(|f| ConditionExpr::is(*f, json!(true)))
                    .collect();

                let and = ConditionExpr::And(leaves.clone());
                let or = ConditionExpr::Or(leaves);

                assert_eq!(and.evaluate(&values), bits.iter().all(|b| *b), "mask {mask}");
                assert_eq!(or.evaluate(&values), bits.iter().any(|b| *b), "mask {mask}");
            }
        }

        #[test]
        fn nested_and_or() {
            let severity = PropertyFieldId::new();
            let acked = PropertyFieldId::new();
            let priority = PropertyFieldId::new();
            let values = values_with(&[
                (severity, json!("critical")),
                (acked, json!(false)),
                (priority, json!("low")),
            ]);

            // critical AND (not acked OR high priority)
            let expr = ConditionExpr::And(vec![
                ConditionExpr::is(severity, json!("critical")),
                ConditionExpr::Or(vec![
                    ConditionExpr::is(acked, json!(false)),
                    ConditionExpr::is(priority, json!("high")),
                ]),
            ]);

            assert!(expr.evaluate(&values));
        }

        #[test]
        fn empty_combinators_use_vacuous_values() {
            let values = PropertyValues::new();
            assert!(ConditionExpr::And(vec![]).evaluate(&values));
            assert!(!ConditionExpr::Or(vec![]).evaluate(&values));
        }

        #[test]
        fn pathological_nesting_does_not_recurse_unbounded() {
            // Build a chain of Ands far deeper than the validation cap
            let field = PropertyFieldId::new();
            let mut expr = ConditionExpr::is(field, json!(true));
            for _ in 0..1000 {
                expr = ConditionExpr::And(vec![expr]);
            }

            // The leaf is unreachable past the clamp, so the whole
            // tree collapses to And's vacuous true
            assert!(expr.evaluate(&PropertyValues::new()));
        }
    }

    mod validate {
        use super::*;

        #[test]
        fn leaf_is_valid() {
            assert!(ConditionExpr::is(PropertyFieldId::new(), json!(1))
                .validate()
                .is_ok());
        }

        #[test]
        fn empty_and_is_rejected() {
            let err = ConditionExpr::And(vec![]).validate().unwrap_err();
            assert!(matches!(err, DomainError::InvalidArgument(_)));
        }

        #[test]
        fn empty_or_is_rejected() {
            assert!(ConditionExpr::Or(vec![]).validate().is_err());
        }

        #[test]
        fn nesting_at_limit_is_accepted() {
            let field = PropertyFieldId::new();
            let mut expr = ConditionExpr::is(field, json!(true));
            for _ in 0..MAX_CONDITION_DEPTH {
                expr = ConditionExpr::And(vec![expr]);
            }
            assert!(expr.validate().is_ok());
        }

        #[test]
        fn nesting_beyond_limit_is_rejected() {
            let field = PropertyFieldId::new();
            let mut expr = ConditionExpr::is(field, json!(true));
            for _ in 0..=MAX_CONDITION_DEPTH {
                expr = ConditionExpr::And(vec![expr]);
            }
            assert!(expr.validate().is_err());
        }

        #[test]
        fn blank_field_reference_is_rejected() {
            assert!(validate_field_reference("  ").is_err());
            assert!(validate_field_reference("f1").is_ok());
        }
    }

    mod field_ids {
        use super::*;

        #[test]
        fn collects_fields_from_all_branches() {
            let a = PropertyFieldId::new();
            let b = PropertyFieldId::new();
            let c = PropertyFieldId::new();

            let expr = ConditionExpr::And(vec![
                ConditionExpr::is(a, json!(1)),
                ConditionExpr::Or(vec![
                    ConditionExpr::is_not(b, json!(2)),
                    ConditionExpr::is(c, json!(3)),
                ]),
            ]);

            let ids = expr.field_ids();
            assert_eq!(ids.len(), 3);
            assert!(ids.contains(&a) && ids.contains(&b) && ids.contains(&c));
        }

        #[test]
        fn duplicate_references_collapse() {
            let a = PropertyFieldId::new();
            let expr = ConditionExpr::Or(vec![
                ConditionExpr::is(a, json!(1)),
                ConditionExpr::is(a, json!(2)),
            ]);
            assert_eq!(expr.field_ids().len(), 1);
        }

        #[test]
        fn references_any_with_empty_filter_matches_everything() {
            let expr = ConditionExpr::is(PropertyFieldId::new(), json!(1));
            assert!(expr.references_any(&[]));
        }

        #[test]
        fn references_any_filters_unrelated_fields() {
            let a = PropertyFieldId::new();
            let expr = ConditionExpr::is(a, json!(1));
            assert!(expr.references_any(&[a]));
            assert!(!expr.references_any(&[PropertyFieldId::new()]));
        }
    }

    mod sanitize {
        use super::*;

        #[test]
        fn trims_string_literals() {
            let field = PropertyFieldId::new();
            let mut expr = ConditionExpr::And(vec![ConditionExpr::is(field, json!("  open  "))]);
            expr.sanitize();

            let expected = ConditionExpr::And(vec![ConditionExpr::is(field, json!("open"))]);
            assert_eq!(expr, expected);
        }

        #[test]
        fn leaves_non_strings_alone() {
            let field = PropertyFieldId::new();
            let mut expr = ConditionExpr::is(field, json!([" a ", 2]));
            let before = expr.clone();
            expr.sanitize();
            assert_eq!(expr, before);
        }
    }

    mod describe {
        use super::*;

        #[test]
        fn renders_is_and_is_not() {
            let severity = PropertyFieldId::new();
            let fields = vec![PropertyField::new(severity, "Severity")];

            let expr = ConditionExpr::is(severity, json!("critical"));
            assert_eq!(expr.describe(&fields), "\"Severity\" is \"critical\"");

            let expr = ConditionExpr::is_not(severity, json!(true));
            assert_eq!(expr.describe(&fields), "\"Severity\" is not true");
        }

        #[test]
        fn renders_combinators_with_parens_for_nesting() {
            let a = PropertyFieldId::new();
            let b = PropertyFieldId::new();
            let fields = vec![
                PropertyField::new(a, "Severity"),
                PropertyField::new(b, "Acknowledged"),
            ];

            let expr = ConditionExpr::And(vec![
                ConditionExpr::is(a, json!("critical")),
                ConditionExpr::Or(vec![
                    ConditionExpr::is(b, json!(false)),
                    ConditionExpr::is(b, json!("never")),
                ]),
            ]);

            assert_eq!(
                expr.describe(&fields),
                "\"Severity\" is \"critical\" AND (\"Acknowledged\" is false OR \"Acknowledged\" is \"never\")"
            );
        }

        #[test]
        fn unknown_field_falls_back_to_id() {
            let field = PropertyFieldId::new();
            let expr = ConditionExpr::is(field, json!(1));
            assert!(expr.describe(&[]).contains(&field.to_string()));
        }
    }

    mod wire_format {
        use super::*;

        #[test]
        fn serializes_with_external_tags() {
            let field = PropertyFieldId::new();
            let expr = ConditionExpr::And(vec![ConditionExpr::is_not(field, json!("x"))]);

            let json = serde_json::to_value(&expr).expect("serialize");
            let and = json.get("and").expect("and tag");
            assert!(and[0].get("isNot").is_some());
            assert_eq!(and[0]["isNot"]["value"], json!("x"));
        }

        #[test]
        fn round_trips() {
            let field = PropertyFieldId::new();
            let expr = ConditionExpr::Or(vec![
                ConditionExpr::is(field, json!(["a", "b"])),
                ConditionExpr::is_not(field, json!(null)),
            ]);

            let encoded = serde_json::to_string(&expr).expect("serialize");
            let decoded: ConditionExpr = serde_json::from_str(&encoded).expect("deserialize");
            assert_eq!(decoded, expr);
        }
    }
}
