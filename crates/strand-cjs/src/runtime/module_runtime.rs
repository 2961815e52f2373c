// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The embedding entry point

use crate::config::RuntimeConfig;
use crate::error::{CjsError, Result};
use crate::globals;
use crate::module_system::{
    load_script, CommonJsResolver, LoaderFn, ModuleHandle, ModuleInfo, ModuleLoader, PathResolver,
};
use boa_engine::class::Class;
use boa_engine::object::FunctionObjectBuilder;
use boa_engine::{Context, JsString, JsValue, NativeFunction, Source};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

/// A script engine with CommonJS module loading.
///
/// Owns the module cache, the extension registry and the resolver for one
/// engine instance. Nothing is shared between runtimes.
pub struct ModuleRuntime {
    // Declared before the context so cached values are released first
    /// Module loader and cache
    loader: Rc<ModuleLoader>,
    /// The script engine
    context: Context,
    /// Configuration this runtime was built with
    config: RuntimeConfig,
}

impl ModuleRuntime {
    /// Create a runtime with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime using the CommonJS resolver
    pub fn with_config(config: RuntimeConfig) -> Result<Self> {
        let resolver = CommonJsResolver::new(config.base_dir(), Vec::<String>::new())
            .with_node_modules(config.node_modules);
        Self::with_resolver(config, resolver)
    }

    /// Create a runtime with a custom resolver
    pub fn with_resolver(config: RuntimeConfig, resolver: impl PathResolver + 'static) -> Result<Self> {
        let loader = ModuleLoader::new(Box::new(resolver));

        let script: Rc<LoaderFn> = Rc::new(load_script);
        for ext in &config.script_extensions {
            loader.register_extension(ext, Rc::clone(&script))?;
        }

        let mut context = Context::default();
        globals::install(&mut context, &loader, &config)?;

        debug!("runtime ready with loaders for {:?}", loader.extensions());

        Ok(Self {
            loader,
            context,
            config,
        })
    }

    /// Install or overwrite the loader for `extension`.
    ///
    /// `"default"` names the loader used when a location's extension has
    /// no loader of its own.
    pub fn register_extension_loader<F>(&mut self, extension: &str, loader: F) -> Result<&mut Self>
    where
        F: Fn(&Path, &ModuleHandle, &mut Context) -> Result<JsValue> + 'static,
    {
        self.loader.register_extension(extension, Rc::new(loader))?;
        Ok(self)
    }

    /// Remove the loader for `extension`. Returns whether one was installed.
    pub fn remove_extension_loader(&mut self, extension: &str) -> bool {
        self.loader.remove_extension(extension)
    }

    /// Publish a host value as a requirable module.
    ///
    /// Fails if `id` is already cached; the first value stays.
    pub fn register_internal_module(&mut self, id: &str, exports: impl Into<JsValue>) -> Result<&mut Self> {
        self.loader.register_internal(id, exports.into())?;
        Ok(self)
    }

    /// Publish a host function as a requirable module
    pub fn register_internal_function(
        &mut self,
        id: &str,
        length: usize,
        function: NativeFunction,
    ) -> Result<&mut Self> {
        let function = FunctionObjectBuilder::new(self.context.realm(), function)
            .name(JsString::from(id))
            .length(length)
            .build();
        self.register_internal_module(id, function)
    }

    /// Publish the constructor of a host class as a requirable module.
    ///
    /// The class is only reachable through `require(id)`.
    pub fn register_internal_class<C: Class>(&mut self, id: &str) -> Result<&mut Self> {
        if self.loader.lookup(id).is_some() {
            return Err(CjsError::DuplicateModule(id.to_string()));
        }

        let ctx = &mut self.context;
        ctx.register_global_class::<C>()?;
        let name = JsString::from(C::NAME);
        let global = ctx.global_object();
        let constructor = global.get(name.clone(), ctx)?;
        global.delete_property_or_throw(name, ctx)?;

        self.register_internal_module(id, constructor)
    }

    /// Run `specifier` as the program's main module
    pub fn run_main(&mut self, specifier: &str) -> Result<JsValue> {
        if specifier.trim().is_empty() {
            return Err(CjsError::invalid_argument(
                "specifier",
                "an entry module is required",
            ));
        }

        info!("running main module '{}'", specifier);
        self.loader.load(specifier, None, &mut self.context)
    }

    /// Load `specifier`, optionally on behalf of the cached module `parent`
    pub fn load(&mut self, specifier: &str, parent: Option<&str>) -> Result<JsValue> {
        let parent = match parent {
            Some(id) => Some(
                self.loader
                    .lookup(id)
                    .ok_or_else(|| CjsError::UnknownModule(id.to_string()))?,
            ),
            None => None,
        };
        self.loader.load(specifier, parent, &mut self.context)
    }

    /// Load `specifier` with no parent, like the global `require`
    pub fn require(&mut self, specifier: &str) -> Result<JsValue> {
        self.load(specifier, None)
    }

    /// Resolve `specifier` against the base directory without loading it
    pub fn resolve(&self, specifier: &str) -> Result<PathBuf> {
        self.loader.resolve(specifier, None)
    }

    /// Evaluate top-level code
    pub fn eval(&mut self, code: &str) -> Result<JsValue> {
        Ok(self.context.eval(Source::from_bytes(code))?)
    }

    /// Snapshot of the module cached under `id`
    pub fn module(&self, id: &str) -> Option<ModuleInfo> {
        self.loader.info(id)
    }

    /// All cached module ids, in creation order
    pub fn module_ids(&self) -> Vec<String> {
        self.loader.module_ids()
    }

    /// Get the configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Get the script engine
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Get the script engine mutably
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Get the module loader
    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }
}

impl fmt::Debug for ModuleRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRuntime")
            .field("config", &self.config)
            .field("modules", &self.loader.module_ids())
            .field("extensions", &self.loader.extensions())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_system::ModuleState;

    #[test]
    fn test_run_main_rejects_blank_specifier() {
        let mut runtime = ModuleRuntime::new().unwrap();
        let err = runtime.run_main("   ").unwrap_err();
        assert!(matches!(err, CjsError::InvalidArgument { .. }));
        assert!(runtime.module_ids().is_empty());
    }

    #[test]
    fn test_load_with_unknown_parent() {
        let mut runtime = ModuleRuntime::new().unwrap();
        let err = runtime.load("x", Some("nobody")).unwrap_err();
        assert!(matches!(err, CjsError::UnknownModule(id) if id == "nobody"));
    }

    #[test]
    fn test_internal_module_through_eval() {
        let mut runtime = ModuleRuntime::new().unwrap();
        runtime.register_internal_module("answer", 42).unwrap();

        let value = runtime.eval("require('answer') + 1").unwrap();
        assert_eq!(value.as_number(), Some(43.0));

        let info = runtime.module("answer").unwrap();
        assert_eq!(info.state, ModuleState::Loaded);
        assert!(info.location.is_none());
    }

    #[test]
    fn test_print_global_is_optional() {
        let config = RuntimeConfig {
            print_global: false,
            ..RuntimeConfig::default()
        };
        let mut runtime = ModuleRuntime::with_config(config).unwrap();
        let kind = runtime.eval("typeof print").unwrap();
        assert_eq!(kind.as_string().unwrap().to_std_string_escaped(), "undefined");

        let kind = runtime.eval("typeof require").unwrap();
        assert_eq!(kind.as_string().unwrap().to_std_string_escaped(), "function");
    }

    #[test]
    fn test_debug_lists_modules() {
        let mut runtime = ModuleRuntime::new().unwrap();
        runtime.register_internal_module("answer", 42).unwrap();
        let debug = format!("{:?}", runtime);
        assert!(debug.contains("\"answer\""));
    }

    #[test]
    fn test_script_extensions_are_registered() {
        let config = RuntimeConfig {
            script_extensions: vec![".cjs".to_string()],
            ..RuntimeConfig::default()
        };
        let runtime = ModuleRuntime::with_config(config).unwrap();
        assert_eq!(
            runtime.loader().extensions(),
            vec!["default", ".js", ".json", ".cjs"]
        );
    }
}
