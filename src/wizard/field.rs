//! Field declarations and the binding between a field and the draft

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::draft::{is_blank, Draft};
use super::rules::{self, Rule};

/// Kind of input a field is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    /// Single choice from a fixed option set (radio group)
    Choice,
    Toggle,
}

impl FieldKind {
    /// Kind name used in rendered field ids
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "input",
            FieldKind::Number => "number",
            FieldKind::Choice => "radiogroup",
            FieldKind::Toggle => "checkbox",
        }
    }
}

/// One option of a choice field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
    pub is_disabled: bool,
    /// Extra content shown under the option
    pub children: Option<String>,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            is_disabled: false,
            children: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.is_disabled = true;
        self
    }

    pub fn with_children(mut self, children: impl Into<String>) -> Self {
        self.children = Some(children.into());
        self
    }
}

/// Declaration of a field owned by a step
#[derive(Clone)]
pub struct FieldSpec {
    pub path: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub help_text: Option<String>,
    pub options: Vec<ChoiceOption>,
    rule: Option<Rule>,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("has_rule", &self.rule.is_some())
            .finish_non_exhaustive()
    }
}

impl FieldSpec {
    pub fn new(path: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            kind,
            required: false,
            help_text: None,
            options: Vec::new(),
            rule: None,
        }
    }

    pub fn text(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(path, label, FieldKind::Text)
    }

    pub fn number(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(path, label, FieldKind::Number)
    }

    /// Choice field; values outside the enabled options are rejected
    pub fn choice(
        path: impl Into<String>,
        label: impl Into<String>,
        options: Vec<ChoiceOption>,
    ) -> Self {
        let rule = rules::one_of(&options);
        let mut spec = Self::new(path, label, FieldKind::Choice);
        spec.options = options;
        spec.with_rule(rule)
    }

    /// Mark the field required; the check runs before any other rule
    pub fn required(mut self, message: impl Into<String>) -> Self {
        self.required = true;
        let required = rules::required(message);
        self.rule = Some(match self.rule.take() {
            Some(existing) => rules::all(vec![required, existing]),
            None => required,
        });
        self
    }

    /// Add a rule, run after the ones already attached
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = Some(match self.rule.take() {
            Some(existing) => rules::all(vec![existing, rule]),
            None => rule,
        });
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    /// Validate a value; a missing value is checked as null
    pub fn validate(&self, value: Option<&Value>) -> Option<String> {
        let rule = self.rule.as_ref()?;
        rule(value.unwrap_or(&Value::Null))
    }

    /// DOM-style id for the rendered control
    pub fn field_id(&self) -> String {
        field_id(&self.path, self.kind)
    }
}

/// `form-{kind}-{path with dashes}-field`
pub fn field_id(path: &str, kind: FieldKind) -> String {
    format!("form-{}-{}-field", kind.as_str(), path.replace('.', "-"))
}

/// Interaction state for one path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldState {
    pub touched: bool,
}

/// Field declarations and interaction state for a session.
///
/// A path may be declared by several steps. Errors are computed from the
/// declarations of the step in scope, so a field never shows an error its
/// step would accept.
#[derive(Debug, Default)]
pub(crate) struct FieldRegistry {
    /// Declarations per path, tagged with the owning step index
    specs: HashMap<String, Vec<(usize, FieldSpec)>>,
    states: HashMap<String, FieldState>,
    scope: usize,
}

impl FieldRegistry {
    pub(crate) fn register(&mut self, step: usize, spec: FieldSpec) {
        self.specs
            .entry(spec.path.clone())
            .or_default()
            .push((step, spec));
    }

    /// Make `step` the step whose declarations drive errors and views
    pub(crate) fn set_scope(&mut self, step: usize) {
        self.scope = step;
    }

    /// Declarations of `path` that apply in the current scope.
    ///
    /// Paths the scoped step does not declare fall back to every declaration.
    fn scoped(&self, path: &str) -> Vec<&FieldSpec> {
        let Some(specs) = self.specs.get(path) else {
            return Vec::new();
        };
        let own: Vec<&FieldSpec> = specs
            .iter()
            .filter(|(step, _)| *step == self.scope)
            .map(|(_, spec)| spec)
            .collect();
        if own.is_empty() {
            specs.iter().map(|(_, spec)| spec).collect()
        } else {
            own
        }
    }

    pub(crate) fn spec(&self, path: &str) -> Option<&FieldSpec> {
        self.scoped(path).into_iter().next()
    }

    pub(crate) fn state(&self, path: &str) -> FieldState {
        self.states.get(path).cloned().unwrap_or_default()
    }

    /// First failing message among the scoped declarations of `path`
    pub(crate) fn validate(&self, path: &str, draft: &Draft) -> Option<String> {
        let value = draft.get(path);
        self.scoped(path)
            .into_iter()
            .find_map(|spec| spec.validate(value))
    }

    /// Error shown to the user: hidden while untouched and empty
    pub(crate) fn visible_error(&self, path: &str, draft: &Draft) -> Option<String> {
        let touched = self.states.get(path).is_some_and(|s| s.touched);
        if !touched && draft.get(path).map_or(true, is_blank) {
            return None;
        }
        self.validate(path, draft)
    }

    /// Record a user write at `path`
    pub(crate) fn touch(&mut self, path: &str) {
        self.states.entry(path.to_string()).or_default().touched = true;
    }

    /// Forget interaction state, keeping declarations
    pub(crate) fn reset(&mut self) {
        self.states.clear();
    }
}

/// Live binding between one draft path and its input control
pub struct FieldBinding<'a> {
    path: String,
    draft: &'a mut Draft,
    registry: &'a mut FieldRegistry,
    frozen: bool,
}

impl<'a> FieldBinding<'a> {
    pub(crate) fn new(
        path: impl Into<String>,
        draft: &'a mut Draft,
        registry: &'a mut FieldRegistry,
        frozen: bool,
    ) -> Self {
        Self {
            path: path.into(),
            draft,
            registry,
            frozen,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> Option<&Value> {
        self.draft.get(&self.path)
    }

    pub fn touched(&self) -> bool {
        self.registry.state(&self.path).touched
    }

    pub fn error(&self) -> Option<String> {
        self.registry.visible_error(&self.path, self.draft)
    }

    /// Write a new value. Never fails; invalid input shows up in [`Self::error`].
    ///
    /// Writes to a finished session are dropped.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        if self.frozen {
            debug!(path = %self.path, "ignoring write to a finished wizard session");
            return;
        }
        self.draft.set(&self.path, value);
        self.registry.touch(&self.path);
    }

    /// Snapshot for the rendering surface
    pub fn view(&self) -> FieldView {
        FieldView::build(&self.path, self.draft, self.registry)
    }
}

/// What a renderer needs to draw one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub id: String,
    pub path: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub help_text: Option<String>,
    pub value: Value,
    pub touched: bool,
    pub error: Option<String>,
    pub options: Vec<ChoiceOption>,
}

impl FieldView {
    pub(crate) fn build(path: &str, draft: &Draft, registry: &FieldRegistry) -> Self {
        let spec = registry.spec(path);
        let kind = spec.map_or(FieldKind::Text, |s| s.kind);
        Self {
            id: field_id(path, kind),
            path: path.to_string(),
            label: spec.map_or_else(|| path.to_string(), |s| s.label.clone()),
            kind,
            required: spec.is_some_and(|s| s.required),
            help_text: spec.and_then(|s| s.help_text.clone()),
            value: draft.get(path).cloned().unwrap_or(Value::Null),
            touched: registry.state(path).touched,
            error: registry.visible_error(path, draft),
            options: spec.map(|s| s.options.clone()).unwrap_or_default(),
        }
    }
}
