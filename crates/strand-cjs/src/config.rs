// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CjsError, Result};

/// Name of the project-level configuration file.
pub const CONFIG_FILE: &str = "strand.toml";

/// Configuration for a [`ModuleRuntime`](crate::ModuleRuntime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Base directory for requests made without a requesting module.
    /// Falls back to the current directory.
    pub base_dir: Option<PathBuf>,

    /// Extra extensions handled by the script loader (e.g. `.cjs`)
    pub script_extensions: Vec<String>,

    /// Walk `node_modules` directories for bare specifiers
    pub node_modules: bool,

    /// Install the `print` global
    pub print_global: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            script_extensions: Vec::new(),
            node_modules: true,
            print_global: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from `strand.toml` in the current directory,
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let project_config = PathBuf::from(CONFIG_FILE);
        if project_config.is_file() {
            config = Self::from_file(&project_config)?;
        }

        config.load_from_env();

        Ok(config)
    }

    /// Parse a single TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| CjsError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `STRAND_*` environment variables.
    fn load_from_env(&mut self) {
        if let Ok(dir) = std::env::var("STRAND_BASE_DIR") {
            if !dir.is_empty() {
                self.base_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(value) = std::env::var("STRAND_NODE_MODULES") {
            if let Some(enabled) = parse_bool(&value) {
                self.node_modules = enabled;
            }
        }
    }

    /// The effective base directory.
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
