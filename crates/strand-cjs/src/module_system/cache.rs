// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module cache for require()

use crate::error::{CjsError, Result};
use crate::module_system::module::{Module, ModuleId, ModuleInfo};
use boa_engine::JsValue;
use rustc_hash::FxHashMap;

/// Owner of every module record of one runtime.
///
/// Records live in a table addressed by [`ModuleId`]; parent and child links
/// are ids into the same table. Ids are keyed by the specifier exactly as it
/// was requested, and at most one record exists per id.
#[derive(Debug, Default)]
pub struct ModuleCache {
    modules: Vec<Module>,
    by_id: FxHashMap<String, ModuleId>,
}

impl ModuleCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a module handle by id
    pub fn lookup(&self, id: &str) -> Option<ModuleId> {
        self.by_id.get(id).copied()
    }

    /// Check if a module id is cached
    pub fn has(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Get a module record
    pub fn get(&self, module: ModuleId) -> Option<&Module> {
        self.modules.get(module.0)
    }

    pub(crate) fn get_mut(&mut self, module: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(module.0)
    }

    /// Add a record under its id. Fails if the id is taken.
    pub(crate) fn insert(&mut self, module: Module) -> Result<ModuleId> {
        if self.by_id.contains_key(module.id()) {
            return Err(CjsError::DuplicateModule(module.id().to_string()));
        }

        let handle = ModuleId(self.modules.len());
        self.by_id.insert(module.id().to_string(), handle);
        self.modules.push(module);
        Ok(handle)
    }

    /// Append `child` to `parent`'s children
    pub(crate) fn link_child(&mut self, parent: ModuleId, child: ModuleId) {
        if let Some(parent) = self.get_mut(parent) {
            parent.push_child(child);
        }
    }

    /// Current exports of a module
    pub fn exports(&self, module: ModuleId) -> Option<JsValue> {
        self.get(module).map(|m| m.exports().clone())
    }

    /// Build an owned snapshot of a record
    pub fn info(&self, module: ModuleId) -> Option<ModuleInfo> {
        let record = self.get(module)?;
        let id_of = |handle: ModuleId| self.get(handle).map(|m| m.id().to_string());

        Some(ModuleInfo {
            id: record.id().to_string(),
            location: record.location().map(|p| p.to_path_buf()),
            kind: record.kind(),
            state: record.state(),
            parent: record.parent().and_then(|p| id_of(p)),
            children: record.children().iter().filter_map(|c| id_of(*c)).collect(),
        })
    }

    /// All cached module ids, in creation order
    pub fn keys(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.id().to_string()).collect()
    }

    /// Iterate over every record, in creation order
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().enumerate().map(|(i, m)| (ModuleId(i), m))
    }

    /// Get the number of cached modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_system::module::ModuleState;
    use std::path::PathBuf;

    fn source(id: &str, parent: Option<ModuleId>) -> Module {
        Module::source(id, PathBuf::from(format!("/src/{id}.js")), JsValue::undefined(), parent)
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut cache = ModuleCache::new();
        let a = cache.insert(source("a", None)).unwrap();

        assert_eq!(cache.lookup("a"), Some(a));
        assert!(cache.has("a"));
        assert!(!cache.has("b"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut cache = ModuleCache::new();
        cache
            .insert(Module::internal("host", JsValue::from(1)))
            .unwrap();

        let err = cache
            .insert(Module::internal("host", JsValue::from(2)))
            .unwrap_err();
        assert!(matches!(err, CjsError::DuplicateModule(id) if id == "host"));

        let first = cache.lookup("host").unwrap();
        assert_eq!(cache.exports(first).unwrap().as_number(), Some(1.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_info_resolves_links_to_ids() {
        let mut cache = ModuleCache::new();
        let main = cache.insert(source("main", None)).unwrap();
        let x = cache.insert(source("x", Some(main))).unwrap();
        cache.link_child(main, x);
        cache.link_child(main, x);
        cache.get_mut(x).unwrap().set_state(ModuleState::Loaded);

        let info = cache.info(main).unwrap();
        assert!(info.is_main());
        assert_eq!(info.children, vec!["x".to_string(), "x".to_string()]);

        let info = cache.info(x).unwrap();
        assert_eq!(info.parent.as_deref(), Some("main"));
        assert_eq!(info.state, ModuleState::Loaded);
    }

    #[test]
    fn test_keys_in_creation_order() {
        let mut cache = ModuleCache::new();
        cache.insert(source("b", None)).unwrap();
        cache.insert(source("a", None)).unwrap();
        assert_eq!(cache.keys(), vec!["b".to_string(), "a".to_string()]);
    }
}
