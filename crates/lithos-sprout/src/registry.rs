// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::collections::BTreeMap;
use std::sync::Arc;

use lithos_gotmpl_engine::{Error, EvalContext, Function};
use serde_json::Value;

use crate::error::HandlerError;
use crate::handler::HandlerLink;
use crate::notice::Notice;

/// Capability implemented by every helper registry.
///
/// A registry is a named group of template functions. The [`crate::Handler`]
/// links itself into the registry first, then asks it to contribute its
/// functions, aliases and notices.
pub trait Registry {
    /// Stable identifier, unique per handler.
    fn uid(&self) -> &str;

    /// Stores the handler link so registered functions can reach shared
    /// settings such as the clock.
    fn link_handler(&mut self, link: HandlerLink);

    /// Adds the registry's functions to `functions`.
    fn register_functions(&self, functions: &mut FunctionMap) -> Result<(), HandlerError>;

    /// Adds alternative names for already registered functions.
    fn register_aliases(&self, _aliases: &mut AliasMap) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Adds notices shown to template authors when a function is used.
    fn register_notices(&self, _notices: &mut Vec<Notice>) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Name-to-implementation table filled by [`Registry::register_functions`].
#[derive(Clone, Default)]
pub struct FunctionMap {
    entries: BTreeMap<String, Arc<Function>>,
}

impl FunctionMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a helper under `name`, replacing any previous entry.
    pub fn add<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&mut EvalContext, &[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(func));
        self
    }

    pub(crate) fn insert_shared(&mut self, name: String, func: Arc<Function>) -> bool {
        self.entries.insert(name, func).is_some()
    }

    /// Fetches a helper by name.
    pub fn get(&self, name: &str) -> Option<Arc<Function>> {
        self.entries.get(name).cloned()
    }

    /// Reports whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Arc<Function>)> {
        self.entries.iter()
    }
}

/// Maps an original function name to the extra names it is reachable under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `aliases` for `original`. Repeated aliases are ignored.
    pub fn add<I, S>(&mut self, original: impl Into<String>, aliases: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.entries.entry(original.into()).or_default();
        for alias in aliases {
            let alias = alias.into();
            if !entry.contains(&alias) {
                entry.push(alias);
            }
        }
        self
    }

    /// Returns the aliases registered for `original`.
    pub fn aliases_of(&self, original: &str) -> &[String] {
        self.entries.get(original).map_or(&[], Vec::as_slice)
    }

    /// Resolves an alias back to the function it points at.
    pub fn original_of(&self, alias: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a == alias))
            .map(|(original, _)| original.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn merge(&mut self, other: AliasMap) {
        for (original, aliases) in other.entries {
            self.add(original, aliases);
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.entries.iter()
    }
}
