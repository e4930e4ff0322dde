//! Field validation rules.
//!
//! A rule is a pure function from a field value to an optional message.
//! Every rule except [`required`] accepts blank values, so optional fields
//! only get checked once something has been entered.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::draft::is_blank;
use super::field::ChoiceOption;

/// Validation rule attached to a field
pub type Rule = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Kubernetes resource names (RFC 1123 labels)
static DNS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

static HTTP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid regex"));

const DNS_LABEL_MAX: usize = 63;

/// Wrap a closure as a rule
pub fn custom(f: impl Fn(&Value) -> Option<String> + Send + Sync + 'static) -> Rule {
    Arc::new(f)
}

/// Value must be present and non-empty
pub fn required(message: impl Into<String>) -> Rule {
    let message = message.into();
    custom(move |value| is_blank(value).then(|| message.clone()))
}

/// Numeric value must be strictly greater than `bound`
pub fn greater_than(bound: f64, message: impl Into<String>) -> Rule {
    let message = message.into();
    custom(move |value| {
        if is_blank(value) {
            return None;
        }
        match as_number(value) {
            Some(n) if n > bound => None,
            _ => Some(message.clone()),
        }
    })
}

/// Numeric value must be at least `min`
pub fn min_number(min: f64, message: impl Into<String>) -> Rule {
    let message = message.into();
    custom(move |value| {
        if is_blank(value) {
            return None;
        }
        match as_number(value) {
            Some(n) if n >= min => None,
            _ => Some(message.clone()),
        }
    })
}

/// String value must not exceed `max` characters
pub fn max_length(max: usize) -> Rule {
    custom(move |value| match value {
        Value::String(s) if s.chars().count() > max => {
            Some(format!("Must be no more than {max} characters"))
        }
        _ => None,
    })
}

/// String value must match `pattern`
pub fn matches(pattern: &str, message: impl Into<String>) -> Result<Rule, regex::Error> {
    let re = Regex::new(pattern)?;
    let message = message.into();
    Ok(custom(move |value| match value {
        Value::String(s) if !s.trim().is_empty() && !re.is_match(s) => Some(message.clone()),
        _ => None,
    }))
}

/// Value must be a valid Kubernetes resource name
pub fn dns_label() -> Rule {
    custom(|value| match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) if s.len() > DNS_LABEL_MAX => Some(format!(
            "Must be no more than {DNS_LABEL_MAX} characters"
        )),
        Value::String(s) if DNS_LABEL.is_match(s) => None,
        Value::Null => None,
        _ => Some(
            "Must consist of lower case alphanumeric characters or '-' and must start and end with an alphanumeric character"
                .to_string(),
        ),
    })
}

/// Value must be an http(s) URL
pub fn url() -> Rule {
    custom(|value| match value {
        Value::String(s) if s.trim().is_empty() || HTTP_URL.is_match(s.trim()) => None,
        Value::Null => None,
        _ => Some("Must be a valid http(s) URL".to_string()),
    })
}

/// Value must be one of the enabled options
pub fn one_of(options: &[ChoiceOption]) -> Rule {
    let allowed: Vec<(String, bool)> = options
        .iter()
        .map(|o| (o.value.clone(), o.is_disabled))
        .collect();
    custom(move |value| {
        if is_blank(value) {
            return None;
        }
        let Some(chosen) = value.as_str() else {
            return Some("Select one of the available options".to_string());
        };
        match allowed.iter().find(|(v, _)| v == chosen) {
            Some((_, false)) => None,
            Some((_, true)) => Some(format!("'{chosen}' is not available")),
            None => Some(format!("'{chosen}' is not a valid option")),
        }
    })
}

/// Run rules in order, reporting the first message
pub fn all(rules: Vec<Rule>) -> Rule {
    custom(move |value| rules.iter().find_map(|rule| rule(value)))
}

/// Interpret a value as a number, accepting numeric strings
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
