//! Step declarations.
//!
//! A step owns a subset of the draft's fields. Its validity is derived from
//! those fields' rules plus optional step-level checks, and whether it is
//! shown at all is a predicate over the draft.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::draft::Draft;
use super::field::FieldSpec;

/// Step-level check returning a message when the step is not valid
pub type StepCheck = Arc<dyn Fn(&Draft) -> Option<String> + Send + Sync>;

/// Predicate deciding whether a step takes part in the flow
pub type Applicability = Arc<dyn Fn(&Draft) -> bool + Send + Sync>;

struct ValidityMemo {
    key: Vec<Option<Value>>,
    valid: bool,
}

/// One wizard step
pub struct StepDescriptor {
    id: String,
    title: String,
    description: Option<String>,
    fields: Vec<FieldSpec>,
    checks: Vec<StepCheck>,
    applicable: Option<Applicability>,
    /// Paths validity depends on; `None` once an undeclared check is added
    watched: Option<BTreeSet<String>>,
    memo: RefCell<Option<ValidityMemo>>,
}

impl fmt::Debug for StepDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("fields", &self.fields)
            .field("checks", &self.checks.len())
            .field("conditional", &self.applicable.is_some())
            .finish_non_exhaustive()
    }
}

impl StepDescriptor {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            fields: Vec::new(),
            checks: Vec::new(),
            applicable: None,
            watched: Some(BTreeSet::new()),
            memo: RefCell::new(None),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a field owned by this step
    pub fn field(mut self, spec: FieldSpec) -> Self {
        if let Some(watched) = self.watched.as_mut() {
            watched.insert(spec.path.clone());
        }
        self.fields.push(spec);
        self.memo.take();
        self
    }

    /// Add a step-level check reading only `paths`
    pub fn validate_on(
        mut self,
        paths: &[&str],
        check: impl Fn(&Draft) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        if let Some(watched) = self.watched.as_mut() {
            watched.extend(paths.iter().map(|p| (*p).to_string()));
        }
        self.checks.push(Arc::new(check));
        self.memo.take();
        self
    }

    /// Add a step-level check that may read anything; disables memoization
    pub fn validate(
        mut self,
        check: impl Fn(&Draft) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.watched = None;
        self.checks.push(Arc::new(check));
        self.memo.take();
        self
    }

    /// Only include this step while `predicate` holds
    pub fn applicable_when(
        mut self,
        predicate: impl Fn(&Draft) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.applicable = Some(Arc::new(predicate));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn is_conditional(&self) -> bool {
        self.applicable.is_some()
    }

    pub fn is_applicable(&self, draft: &Draft) -> bool {
        self.applicable.as_ref().map_or(true, |p| p(draft))
    }

    /// Whether every field rule and step check passes.
    ///
    /// Reuses the previous answer while the watched paths hold the same
    /// values.
    pub fn is_valid(&self, draft: &Draft) -> bool {
        let Some(watched) = self.watched.as_ref() else {
            return self.problems(draft).is_empty();
        };

        let key = draft.values_at(&watched.iter().collect::<Vec<_>>());
        if let Some(memo) = self.memo.borrow().as_ref() {
            if memo.key == key {
                return memo.valid;
            }
        }

        let valid = self.problems(draft).is_empty();
        *self.memo.borrow_mut() = Some(ValidityMemo { key, valid });
        valid
    }

    /// Every reason the step is currently invalid
    pub fn problems(&self, draft: &Draft) -> Vec<String> {
        let field_errors = self.fields.iter().filter_map(|spec| {
            spec.validate(draft.get(&spec.path))
                .map(|message| format!("{}: {}", spec.label, message))
        });
        let check_errors = self.checks.iter().filter_map(|check| check(draft));
        field_errors.chain(check_errors).collect()
    }
}
