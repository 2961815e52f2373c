// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module loader - resolves, registers and executes modules

use crate::error::{CjsError, Result};
use crate::module_system::cache::ModuleCache;
use crate::module_system::extensions::{ExtensionRegistry, LoaderFn};
use crate::module_system::module::{Module, ModuleId, ModuleInfo, ModuleState};
use crate::module_system::require::ModuleRef;
use crate::module_system::resolver::{PathResolver, Requester};
use boa_engine::{Context, JsObject, JsValue};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

/// Module loader state shared between the host and script-side `require`.
///
/// Every borrow of the inner cells is released before a loader runs, so
/// loaders may re-enter [`ModuleLoader::load`] freely.
pub struct ModuleLoader {
    /// Self reference handed to loaders and script closures
    this: Weak<ModuleLoader>,
    /// Module cache
    cache: RefCell<ModuleCache>,
    /// Extension to loader dispatch
    extensions: RefCell<ExtensionRegistry>,
    /// Module resolver
    resolver: RefCell<Box<dyn PathResolver>>,
}

impl ModuleLoader {
    /// Create a loader with the built-in extension loaders.
    pub fn new(resolver: Box<dyn PathResolver>) -> Rc<Self> {
        let extensions = ExtensionRegistry::with_builtin_loaders();
        let mut resolver = resolver;
        for ext in extensions.extensions() {
            resolver.extension_registered(ext);
        }

        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            cache: RefCell::new(ModuleCache::new()),
            extensions: RefCell::new(extensions),
            resolver: RefCell::new(resolver),
        })
    }

    /// Load a module, reusing the cached record when `specifier` was seen
    /// before.
    pub fn load(
        &self,
        specifier: &str,
        parent: Option<ModuleId>,
        ctx: &mut Context,
    ) -> Result<JsValue> {
        if specifier.is_empty() {
            return Err(CjsError::invalid_argument(
                "specifier",
                "a module id is required",
            ));
        }

        let cached = self.cache.borrow().lookup(specifier);
        if let Some(module) = cached {
            trace!("cache hit for '{}'", specifier);
            let mut cache = self.cache.borrow_mut();
            if let Some(parent) = parent {
                cache.link_child(parent, module);
            }
            return Ok(cache.exports(module).unwrap_or_default());
        }

        self.create_module(specifier, parent, ctx)
    }

    /// Resolve, register, then execute a new source module.
    ///
    /// The record is cached before its loader runs so a cyclic require sees
    /// the exports as they are at that point instead of recursing.
    fn create_module(
        &self,
        id: &str,
        parent: Option<ModuleId>,
        ctx: &mut Context,
    ) -> Result<JsValue> {
        // Nothing is cached if resolution or loader selection fails. The
        // parent link needs the child's table handle, so it comes after both.
        let location = self.resolve(id, parent)?;
        let extension = self.resolver.borrow().extension_of(&location);
        let loader = self.extensions.borrow().select(&extension)?;

        let exports = JsValue::from(JsObject::with_object_proto(ctx.intrinsics()));
        let module = {
            let mut cache = self.cache.borrow_mut();
            let module = cache.insert(Module::source(id, location.clone(), exports, parent))?;
            if let Some(parent) = parent {
                cache.link_child(parent, module);
            }
            module
        };
        debug!(
            "loading module '{}' from {} ({})",
            id,
            location.display(),
            if extension.is_empty() { "no extension" } else { extension.as_str() }
        );

        self.set_state(module, ModuleState::Executing);
        let handle = self.handle(module)?;

        match loader(&location, &handle, ctx) {
            Ok(exports) => {
                if let Some(record) = self.cache.borrow_mut().get_mut(module) {
                    record.set_exports(exports.clone());
                    record.set_state(ModuleState::Loaded);
                }
                Ok(exports)
            }
            Err(err) => {
                // The partial record stays cached; later requires reuse it
                warn!("module '{}' failed while loading: {}", id, err);
                self.set_state(module, ModuleState::Failed);
                Err(err)
            }
        }
    }

    /// Resolve `specifier` as if required by `requester`, without loading.
    pub fn resolve(&self, specifier: &str, requester: Option<ModuleId>) -> Result<PathBuf> {
        let cache = self.cache.borrow();
        let requester = requester.and_then(|m| cache.get(m)).map(|m| Requester {
            id: m.id(),
            location: m.location(),
        });
        self.resolver.borrow().resolve_path(specifier, requester)
    }

    /// Cache a host-provided value under `id`.
    pub fn register_internal(&self, id: &str, exports: JsValue) -> Result<ModuleId> {
        if id.trim().is_empty() {
            return Err(CjsError::invalid_argument("id", "a module id is required"));
        }
        let module = self.cache.borrow_mut().insert(Module::internal(id, exports))?;
        debug!("registered internal module '{}'", id);
        Ok(module)
    }

    /// Install or overwrite the loader for `extension`.
    pub fn register_extension(&self, extension: &str, loader: Rc<LoaderFn>) -> Result<()> {
        let replaced = self.extensions.borrow_mut().register(extension, loader)?;
        if replaced.is_none() {
            self.resolver.borrow_mut().extension_registered(extension);
        }
        debug!("registered loader for '{}'", extension);
        Ok(())
    }

    /// Remove the loader for `extension`
    pub fn remove_extension(&self, extension: &str) -> bool {
        self.extensions.borrow_mut().remove(extension)
    }

    /// Registered extension keys, in registration order
    pub fn extensions(&self) -> Vec<String> {
        self.extensions
            .borrow()
            .extensions()
            .map(str::to_string)
            .collect()
    }

    /// Handle of the module cached under `id`
    pub fn lookup(&self, id: &str) -> Option<ModuleId> {
        self.cache.borrow().lookup(id)
    }

    /// Snapshot of the module cached under `id`
    pub fn info(&self, id: &str) -> Option<ModuleInfo> {
        let cache = self.cache.borrow();
        cache.lookup(id).and_then(|module| cache.info(module))
    }

    /// All cached module ids, in creation order
    pub fn module_ids(&self) -> Vec<String> {
        self.cache.borrow().keys()
    }

    /// Number of cached modules
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    pub(crate) fn exports(&self, module: ModuleId) -> JsValue {
        self.cache.borrow().exports(module).unwrap_or_default()
    }

    pub(crate) fn set_exports(&self, module: ModuleId, exports: JsValue) {
        if let Some(record) = self.cache.borrow_mut().get_mut(module) {
            record.set_exports(exports);
        }
    }

    pub(crate) fn state(&self, module: ModuleId) -> Option<ModuleState> {
        self.cache.borrow().get(module).map(Module::state)
    }

    fn set_state(&self, module: ModuleId, state: ModuleState) {
        if let Some(record) = self.cache.borrow_mut().get_mut(module) {
            record.set_state(state);
        }
    }

    pub(crate) fn weak(&self) -> Weak<ModuleLoader> {
        self.this.clone()
    }

    fn handle(&self, module: ModuleId) -> Result<ModuleHandle> {
        let loader = self
            .this
            .upgrade()
            .ok_or_else(|| CjsError::UnknownModule(format!("#{}", module.index())))?;
        Ok(ModuleHandle { loader, module })
    }
}

/// A module as seen by an extension loader while it runs.
#[derive(Clone)]
pub struct ModuleHandle {
    loader: Rc<ModuleLoader>,
    module: ModuleId,
}

impl ModuleHandle {
    /// Table handle of the module
    pub fn module_id(&self) -> ModuleId {
        self.module
    }

    /// Id the module was requested with
    pub fn id(&self) -> String {
        self.with_record(|m| m.id().to_string()).unwrap_or_default()
    }

    /// Resolved location
    pub fn location(&self) -> Option<PathBuf> {
        self.with_record(|m| m.location().map(Path::to_path_buf))
            .flatten()
    }

    /// True iff no module required this one
    pub fn is_main(&self) -> bool {
        self.with_record(Module::is_main).unwrap_or(true)
    }

    /// Current lifecycle state
    pub fn state(&self) -> Option<ModuleState> {
        self.loader.state(self.module)
    }

    /// Current exports
    pub fn exports(&self) -> JsValue {
        self.loader.exports(self.module)
    }

    /// Replace the exports
    pub fn set_exports(&self, exports: JsValue) {
        self.loader.set_exports(self.module, exports);
    }

    /// Read source text through the runtime's resolver
    pub fn read_source(&self, location: &Path) -> Result<String> {
        self.loader.resolver.borrow().read_all_text(location)
    }

    /// Require `specifier` with this module as the parent
    pub fn require(&self, specifier: &str, ctx: &mut Context) -> Result<JsValue> {
        self.loader.load(specifier, Some(self.module), ctx)
    }

    /// Resolve `specifier` relative to this module without loading it
    pub fn resolve(&self, specifier: &str) -> Result<PathBuf> {
        self.loader.resolve(specifier, Some(self.module))
    }

    pub(crate) fn module_ref(&self) -> ModuleRef {
        ModuleRef::new(self.loader.weak(), Some(self.module))
    }

    fn with_record<T>(&self, f: impl FnOnce(&Module) -> T) -> Option<T> {
        self.loader.cache.borrow().get(self.module).map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Serves sources from memory; every location is `<specifier>`.
    struct MapResolver(HashMap<String, String>);

    impl PathResolver for MapResolver {
        fn resolve_path(&self, specifier: &str, _: Option<Requester<'_>>) -> Result<PathBuf> {
            if self.0.contains_key(specifier) {
                Ok(PathBuf::from(specifier))
            } else {
                Err(CjsError::module_not_found(specifier))
            }
        }

        fn read_all_text(&self, location: &Path) -> Result<String> {
            self.0
                .get(location.to_string_lossy().as_ref())
                .cloned()
                .ok_or_else(|| CjsError::module_not_found(location.display().to_string()))
        }
    }

    fn loader(files: &[(&str, &str)]) -> Rc<ModuleLoader> {
        let files = files
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ModuleLoader::new(Box::new(MapResolver(files)))
    }

    #[test]
    fn test_empty_specifier_is_rejected() {
        let loader = loader(&[]);
        let mut ctx = Context::default();
        let err = loader.load("", None, &mut ctx).unwrap_err();
        assert!(matches!(err, CjsError::InvalidArgument { .. }));
        assert!(loader.is_empty());
    }

    #[test]
    fn test_resolution_failure_caches_nothing() {
        let loader = loader(&[]);
        let mut ctx = Context::default();
        let err = loader.load("missing.js", None, &mut ctx).unwrap_err();
        assert!(matches!(err, CjsError::ModuleNotFound(_)));
        assert!(loader.lookup("missing.js").is_none());
    }

    #[test]
    fn test_loaded_state_and_exports() {
        let loader = loader(&[("answer.js", "module.exports = 42;")]);
        let mut ctx = Context::default();

        let exports = loader.load("answer.js", None, &mut ctx).unwrap();
        assert_eq!(exports.as_number(), Some(42.0));

        let info = loader.info("answer.js").unwrap();
        assert_eq!(info.state, ModuleState::Loaded);
        assert_eq!(info.location, Some(PathBuf::from("answer.js")));
        assert!(info.is_main());
    }

    #[test]
    fn test_failed_module_stays_cached() {
        let loader = loader(&[(
            "broken.js",
            "exports.before = 1; throw new Error('boom'); exports.after = 2;",
        )]);
        let mut ctx = Context::default();

        let err = loader.load("broken.js", None, &mut ctx).unwrap_err();
        assert!(err.is_script_error());
        assert_eq!(loader.info("broken.js").unwrap().state, ModuleState::Failed);

        // The second require does not re-run the body
        let partial = loader.load("broken.js", None, &mut ctx).unwrap();
        let object = partial.as_object().unwrap();
        let before = object
            .get(boa_engine::js_string!("before"), &mut ctx)
            .unwrap();
        let after = object
            .get(boa_engine::js_string!("after"), &mut ctx)
            .unwrap();
        assert_eq!(before.as_number(), Some(1.0));
        assert!(after.is_undefined());
    }

    #[test]
    fn test_internal_registration_collides() {
        let loader = loader(&[]);
        loader.register_internal("host", JsValue::from(1)).unwrap();
        let err = loader.register_internal("host", JsValue::from(2)).unwrap_err();
        assert!(matches!(err, CjsError::DuplicateModule(_)));

        let mut ctx = Context::default();
        let exports = loader.load("host", None, &mut ctx).unwrap();
        assert_eq!(exports.as_number(), Some(1.0));
    }

    #[test]
    fn test_missing_loader_leaves_no_record() {
        let loader = loader(&[("notes.txt", "")]);
        assert!(loader.remove_extension("default"));
        let mut ctx = Context::default();

        let err = loader.load("notes.txt", None, &mut ctx).unwrap_err();
        assert!(matches!(err, CjsError::NoLoader { .. }));
        assert!(loader.lookup("notes.txt").is_none());
    }
}
