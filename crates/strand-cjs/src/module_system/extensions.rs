// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Extension registry and the built-in script/JSON loaders

use crate::error::{CjsError, Result};
use crate::module_system::loader::ModuleHandle;
use crate::module_system::require;
use boa_engine::{Context, JsString, JsValue};
use indexmap::IndexMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// Registry key used when a location's extension has no loader
pub const DEFAULT_LOADER: &str = "default";

/// Turns the source at a resolved location into the module's exports.
pub type LoaderFn = dyn Fn(&Path, &ModuleHandle, &mut Context) -> Result<JsValue>;

/// Ordered map from file extension to loader.
///
/// Registration order is kept so resolvers can try extensions in the order
/// they were added.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    loaders: IndexMap<String, Rc<LoaderFn>>,
}

impl ExtensionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `default` and `.js` mapped to the script loader and
    /// `.json` to the JSON loader
    pub fn with_builtin_loaders() -> Self {
        let script: Rc<LoaderFn> = Rc::new(load_script);
        let json: Rc<LoaderFn> = Rc::new(load_json);

        let mut registry = Self::new();
        registry.loaders.insert(DEFAULT_LOADER.to_string(), Rc::clone(&script));
        registry.loaders.insert(".js".to_string(), script);
        registry.loaders.insert(".json".to_string(), json);
        registry
    }

    /// Install or overwrite the loader for `extension`.
    /// Returns the loader it replaced.
    pub fn register(
        &mut self,
        extension: &str,
        loader: Rc<LoaderFn>,
    ) -> Result<Option<Rc<LoaderFn>>> {
        if extension.is_empty() {
            return Err(CjsError::invalid_argument(
                "extension",
                "must be a non-empty string",
            ));
        }
        Ok(self.loaders.insert(extension.to_string(), loader))
    }

    /// Remove the loader for `extension`
    pub fn remove(&mut self, extension: &str) -> bool {
        self.loaders.shift_remove(extension).is_some()
    }

    /// Loader registered for exactly `extension`
    pub fn get(&self, extension: &str) -> Option<Rc<LoaderFn>> {
        self.loaders.get(extension).cloned()
    }

    /// Loader for `extension`, falling back to `default`
    pub fn select(&self, extension: &str) -> Result<Rc<LoaderFn>> {
        self.get(extension)
            .or_else(|| self.get(DEFAULT_LOADER))
            .ok_or_else(|| CjsError::NoLoader {
                extension: extension.to_string(),
            })
    }

    /// Check if `extension` has its own loader
    pub fn contains(&self, extension: &str) -> bool {
        self.loaders.contains_key(extension)
    }

    /// Registered keys, in registration order
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    /// Number of registered loaders
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Check if no loader is registered
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.loaders.keys()).finish()
    }
}

/// Execute a script module inside the CommonJS function wrapper.
///
/// The wrapper receives `module`, `exports`, `__dirname`, `require` and
/// `__filename`. Whatever `module.exports` holds once the body returns is
/// the module's export value.
pub fn load_script(location: &Path, module: &ModuleHandle, ctx: &mut Context) -> Result<JsValue> {
    let source = module.read_source(location)?;
    let function = require::compile_wrapper(&source, ctx)?;

    let module_object = require::module_object(module, ctx)?;
    let require_fn = require::module_require(module, ctx)?;
    let exports = module.exports();
    let dirname = location
        .parent()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();
    let filename = location.display().to_string();

    function.call(
        &exports,
        &[
            module_object.into(),
            exports.clone(),
            JsString::from(dirname.as_str()).into(),
            require_fn.into(),
            JsString::from(filename.as_str()).into(),
        ],
        ctx,
    )?;

    Ok(module.exports())
}

/// Parse the location as JSON; the parsed value becomes the exports.
pub fn load_json(location: &Path, module: &ModuleHandle, ctx: &mut Context) -> Result<JsValue> {
    let text = module.read_source(location)?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    let value = JsValue::from_json(&json, ctx)?;

    module.set_exports(value.clone());
    Ok(value)
}
