//! Predicate value coercion, expression compilation, and label derivation.

use crate::model::config::{CompiledExpression, PredicateKind, ValueContract};

/// Force a stored value into its kind's contract.
///
/// Kinds without a value contract always hold the empty string; enumerated
/// kinds fall back to the first legal option when the stored value is not in
/// the set (a retype can leave free text behind in an enumerated slot).
pub fn coerce_value(kind: PredicateKind, value: &str) -> String {
    match kind.value_contract() {
        ValueContract::None => String::new(),
        ValueContract::FreeText => value.to_string(),
        ValueContract::Enumerated(options) => {
            if options.contains(&value) {
                value.to_string()
            } else {
                options.first().copied().unwrap_or_default().to_string()
            }
        }
    }
}

/// Compile a (kind, coerced value) pair into the expression the execution
/// runtime evaluates. Kinds resolved structurally compile to `None`.
pub fn compile(kind: PredicateKind, value: &str) -> Option<CompiledExpression> {
    match kind {
        PredicateKind::TextContains => Some(CompiledExpression::Contains {
            text: value.to_string(),
        }),
        PredicateKind::TextEquals => Some(CompiledExpression::Equals {
            text: value.to_string(),
        }),
        PredicateKind::TextStartsWith => Some(CompiledExpression::StartsWith {
            text: value.to_string(),
        }),
        PredicateKind::MessageTypeIs => Some(CompiledExpression::MessageTypeIs {
            value: value.to_string(),
        }),
        PredicateKind::AffirmativeReply
        | PredicateKind::NegativeReply
        | PredicateKind::AlwaysTrue => None,
    }
}

/// Human-readable branch label, used unless the user typed their own.
pub fn derived_label(kind: PredicateKind, value: &str) -> String {
    match kind {
        PredicateKind::TextContains => format!("Contains \"{}\"", value),
        PredicateKind::TextEquals => format!("Equals \"{}\"", value),
        PredicateKind::TextStartsWith => format!("Starts with \"{}\"", value),
        PredicateKind::MessageTypeIs => format!("Message is {}", value),
        PredicateKind::AffirmativeReply => "Affirmative reply".to_string(),
        PredicateKind::NegativeReply => "Negative reply".to_string(),
        PredicateKind::AlwaysTrue => "Always".to_string(),
    }
}
