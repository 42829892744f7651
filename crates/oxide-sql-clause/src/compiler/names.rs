//! Per-compilation name registries.

use std::collections::HashMap;

use tracing::trace;

use crate::elements::{AnonName, BindParameter, ClauseElement, ElementId, Name};
use crate::error::{Error, Result};
use crate::types::DataType;
use crate::value::BindValue;

/// Assigns `<base>_<n>` names to anonymous labels, aliases and binds.
///
/// Counters are per base and start at 1 in every compilation; a token that
/// was already named gets the same name again.
#[derive(Debug, Default)]
pub(crate) struct AnonymousNames {
    counters: HashMap<String, usize>,
    assigned: HashMap<ElementId, String>,
}

impl AnonymousNames {
    pub(crate) fn resolve(&mut self, name: &AnonName) -> String {
        if let Some(existing) = self.assigned.get(&name.token) {
            trace!(token = %name.token, name = %existing, "anonymous name memo hit");
            return existing.clone();
        }
        let counter = self.counters.entry(name.base.clone()).or_insert(0);
        *counter += 1;
        let rendered = format!("{}_{}", name.base, counter);
        self.assigned.insert(name.token, rendered.clone());
        rendered
    }

    pub(crate) fn name(&mut self, name: &Name) -> String {
        match name {
            Name::Given(given) => given.clone(),
            Name::Anonymous(anon) => self.resolve(anon),
        }
    }
}

/// A bind parameter of a compiled statement.
#[derive(Debug, Clone)]
pub struct BoundParameter {
    pub(crate) name: String,
    pub(crate) value: Option<BindValue>,
    pub(crate) data_type: DataType,
    pub(crate) expanding: bool,
    pub(crate) unique: bool,
    pub(crate) source: ElementId,
}

impl BoundParameter {
    /// The rendered parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value bound at construction time.
    #[must_use]
    pub const fn value(&self) -> Option<&BindValue> {
        self.value.as_ref()
    }

    /// The SQL type.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Whether the parameter is a postcompile list.
    #[must_use]
    pub const fn is_expanding(&self) -> bool {
        self.expanding
    }
}

/// Bind parameters of one compilation, in order of first appearance.
#[derive(Debug, Default)]
pub(crate) struct BindRegistry {
    binds: Vec<BoundParameter>,
    by_name: HashMap<String, usize>,
}

impl BindRegistry {
    /// Registers an occurrence of `bind` under `name`, returning its slot.
    ///
    /// Occurrences of the same element share a slot. Distinct elements
    /// may share a name only if neither is unique and both agree on being
    /// expanding.
    pub(crate) fn register(
        &mut self,
        name: String,
        element: &ClauseElement,
        bind: &BindParameter,
    ) -> Result<usize> {
        if let Some(&slot) = self.by_name.get(&name) {
            let existing = &mut self.binds[slot];
            if existing.source != element.key() && (existing.unique || bind.unique) {
                return Err(Error::compile(format!(
                    "Bind parameter '{name}' conflicts with unique bind parameter of the same name"
                )));
            }
            if existing.expanding != bind.expanding {
                return Err(Error::compile(format!(
                    "Can't reuse bind parameter '{name}' in expanding and non-expanding contexts"
                )));
            }
            if existing.value.is_none() {
                existing.value.clone_from(&bind.value);
            }
            return Ok(slot);
        }
        let slot = self.binds.len();
        self.by_name.insert(name.clone(), slot);
        self.binds.push(BoundParameter {
            name,
            value: bind.value.clone(),
            data_type: bind.data_type.clone(),
            expanding: bind.expanding,
            unique: bind.unique,
            source: element.key(),
        });
        Ok(slot)
    }

    pub(crate) fn into_vec(self) -> Vec<BoundParameter> {
        self.binds
    }
}
