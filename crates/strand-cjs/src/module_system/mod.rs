// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS module system implementation
//!
//! - `require()` function, global and module-scoped
//! - `module.exports` / `exports`
//! - Synchronous loading, executed once and cached by id
//! - Extension loaders for scripts, JSON and host-defined formats
//! - Pluggable path resolution

mod cache;
mod extensions;
mod loader;
mod module;
mod require;
mod resolver;

pub use cache::ModuleCache;
pub use extensions::{load_json, load_script, ExtensionRegistry, LoaderFn, DEFAULT_LOADER};
pub use loader::{ModuleHandle, ModuleLoader};
pub use module::{Module, ModuleId, ModuleInfo, ModuleKind, ModuleState};
pub use require::WRAPPER_PARAMS;
pub use resolver::{dotted_extension, CommonJsResolver, PathResolver, Requester};

pub(crate) use require::global_require;
