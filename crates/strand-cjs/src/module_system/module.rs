// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module records

use boa_engine::JsValue;
use std::fmt;
use std::path::{Path, PathBuf};

/// Handle to a module record inside a [`ModuleCache`](super::ModuleCache).
///
/// Handles are indices into the cache's module table. They stay valid for
/// the lifetime of the cache since records are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) usize);

impl ModuleId {
    /// Position of the record in the module table
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a module's exports were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Loaded from a resolved location through an extension loader
    Source,
    /// Registered directly by the host
    Internal,
}

/// Lifecycle of a module record once it is in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Cached with its initial empty exports, loader not yet invoked
    Registered,
    /// Loader is running (nested requires may observe partial exports)
    Executing,
    /// Loader finished; exports are final
    Loaded,
    /// Loader raised an error; exports are whatever it reached
    Failed,
}

impl ModuleState {
    /// Returns true once the loader returned successfully.
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Loaded)
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Registered => "registered",
            Self::Executing => "executing",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One loaded unit of code: identity, exports and place in the require graph.
#[derive(Debug, Clone)]
pub struct Module {
    id: String,
    location: Option<PathBuf>,
    kind: ModuleKind,
    state: ModuleState,
    exports: JsValue,
    parent: Option<ModuleId>,
    children: Vec<ModuleId>,
}

impl Module {
    /// A source-backed record, before its loader has run.
    pub(crate) fn source(
        id: impl Into<String>,
        location: PathBuf,
        exports: JsValue,
        parent: Option<ModuleId>,
    ) -> Self {
        Self {
            id: id.into(),
            location: Some(location),
            kind: ModuleKind::Source,
            state: ModuleState::Registered,
            exports,
            parent,
            children: Vec::new(),
        }
    }

    /// A host-provided record. It is loaded from the start.
    pub(crate) fn internal(id: impl Into<String>, exports: JsValue) -> Self {
        Self {
            id: id.into(),
            location: None,
            kind: ModuleKind::Internal,
            state: ModuleState::Loaded,
            exports,
            parent: None,
            children: Vec::new(),
        }
    }

    /// The specifier this module was requested with (its cache key)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolved source location; `None` for internal modules
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Source or internal
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// Current lifecycle state
    pub fn state(&self) -> ModuleState {
        self.state
    }

    /// Current export value. Mid-execution this may be incomplete.
    pub fn exports(&self) -> &JsValue {
        &self.exports
    }

    /// The module whose `require` created this one
    pub fn parent(&self) -> Option<ModuleId> {
        self.parent
    }

    /// Every require this module issued, in call order
    pub fn children(&self) -> &[ModuleId] {
        &self.children
    }

    /// True iff nothing required this module (entry or internal)
    pub fn is_main(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn set_exports(&mut self, exports: JsValue) {
        self.exports = exports;
    }

    pub(crate) fn set_state(&mut self, state: ModuleState) {
        self.state = state;
    }

    pub(crate) fn push_child(&mut self, child: ModuleId) {
        self.children.push(child);
    }
}

/// Owned snapshot of a module record for host-side inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Module id
    pub id: String,
    /// Resolved location
    pub location: Option<PathBuf>,
    /// Source or internal
    pub kind: ModuleKind,
    /// Lifecycle state
    pub state: ModuleState,
    /// Id of the requiring module
    pub parent: Option<String>,
    /// Ids of required modules, in call order
    pub children: Vec<String>,
}

impl ModuleInfo {
    /// True iff the module has no parent
    pub fn is_main(&self) -> bool {
        self.parent.is_none()
    }
}
