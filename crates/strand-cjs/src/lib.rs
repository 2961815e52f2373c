// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # strand-cjs
//!
//! CommonJS modules for the Boa JavaScript engine.
//!
//! This crate adds `require()` and `module.exports` on top of an embedded
//! engine:
//!
//! - A per-runtime module cache with at most one record per id
//! - Cyclic requires that observe partially initialized exports
//! - Extension loaders (`.js`, `.json`, a `default` fallback, and your own)
//! - A pluggable resolver, with Node-style file, directory and
//!   `node_modules` resolution by default
//! - Internal modules published by the host
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strand_cjs::{ModuleRuntime, RuntimeConfig};
//!
//! fn main() -> strand_cjs::Result<()> {
//!     let mut runtime = ModuleRuntime::with_config(RuntimeConfig::load()?)?;
//!     runtime.register_internal_module("answer", 42)?;
//!
//!     let exports = runtime.run_main("./main")?;
//!     println!("{}", exports.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Loaders
//!
//! ```rust,no_run
//! use boa_engine::{JsString, JsValue};
//! use strand_cjs::ModuleRuntime;
//!
//! # fn main() -> strand_cjs::Result<()> {
//! let mut runtime = ModuleRuntime::new()?;
//! runtime.register_extension_loader(".txt", |location, module, _ctx| {
//!     let text = module.read_source(location)?;
//!     Ok(JsValue::from(JsString::from(text.trim())))
//! })?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod globals;
pub mod module_system;
pub mod runtime;

// Re-exports
pub use boa_engine;
pub use config::RuntimeConfig;
pub use error::{CjsError, Result};
pub use module_system::{
    CommonJsResolver, ExtensionRegistry, LoaderFn, ModuleHandle, ModuleId, ModuleInfo,
    ModuleKind, ModuleLoader, ModuleState, PathResolver, Requester, DEFAULT_LOADER,
};
pub use runtime::ModuleRuntime;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
