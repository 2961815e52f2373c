// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution

use crate::error::{CjsError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The module issuing a require, as seen by a resolver.
#[derive(Debug, Clone, Copy)]
pub struct Requester<'a> {
    /// Id of the requiring module
    pub id: &'a str,
    /// Where the requiring module was loaded from
    pub location: Option<&'a Path>,
}

impl<'a> Requester<'a> {
    /// Directory relative requests are joined against
    pub fn directory(&self) -> Option<&'a Path> {
        self.location.and_then(Path::parent)
    }
}

/// Strategy turning a specifier into a loadable location.
///
/// Resolution must be deterministic for a given backing store. A `None`
/// requester means the request comes from the host (entry module or the
/// global `require`).
pub trait PathResolver {
    /// Map `specifier` to a location, or fail with a resolution error.
    fn resolve_path(&self, specifier: &str, requester: Option<Requester<'_>>) -> Result<PathBuf>;

    /// Extension used for loader dispatch, with its leading dot.
    fn extension_of(&self, location: &Path) -> String {
        dotted_extension(location)
    }

    /// Read the raw source text at `location`.
    fn read_all_text(&self, location: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(location)?)
    }

    /// Called when a loader is registered for a new extension.
    fn extension_registered(&mut self, _extension: &str) {}
}

/// `".js"` for `a/b.js`, empty when there is no extension
pub fn dotted_extension(location: &Path) -> String {
    location
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// File-system resolver following CommonJS lookup order.
#[derive(Debug, Clone)]
pub struct CommonJsResolver {
    /// Where host-issued requests are resolved from
    base_dir: PathBuf,
    /// File extensions to try, in registration order
    extensions: Vec<String>,
    /// Walk `node_modules` for bare specifiers
    node_modules: bool,
}

impl CommonJsResolver {
    /// Create a resolver rooted at `base_dir` trying `extensions` in order.
    pub fn new<I, S>(base_dir: impl Into<PathBuf>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut resolver = Self {
            base_dir: base_dir.into(),
            extensions: Vec::new(),
            node_modules: true,
        };
        for ext in extensions {
            let ext: String = ext.into();
            resolver.add_extension(&ext);
        }
        resolver
    }

    /// Enable or disable `node_modules` lookup
    pub fn with_node_modules(mut self, enabled: bool) -> Self {
        self.node_modules = enabled;
        self
    }

    /// Extensions tried when the exact path does not exist
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Base directory for host-issued requests
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn add_extension(&mut self, ext: &str) {
        // "default" is a loader key, not a file extension
        if ext.is_empty() || ext == "default" {
            return;
        }
        let ext = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{}", ext)
        };
        if !self.extensions.contains(&ext) {
            self.extensions.push(ext);
        }
    }

    fn is_path_like(specifier: &str) -> bool {
        specifier == "."
            || specifier == ".."
            || specifier.starts_with("./")
            || specifier.starts_with("../")
            || Path::new(specifier).is_absolute()
    }

    /// Resolve a file path: exact, then with extensions, then as a directory
    fn resolve_file(&self, path: &Path) -> Result<Option<PathBuf>> {
        if let Some(found) = self.with_extensions(path) {
            return Ok(Some(found));
        }
        if path.is_dir() {
            return self.resolve_directory(path);
        }
        Ok(None)
    }

    fn with_extensions(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(normalize(path));
        }
        self.extensions
            .iter()
            .map(|ext| append_extension(path, ext))
            .find(|candidate| candidate.is_file())
            .map(|candidate| normalize(&candidate))
    }

    /// Resolve a directory (package.json main, then index files)
    fn resolve_directory(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let package_json_path = dir.join("package.json");
        if package_json_path.is_file() {
            let content = std::fs::read_to_string(&package_json_path)?;
            let package: PackageJson =
                serde_json::from_str(&content).map_err(|e| CjsError::ModuleResolution {
                    module: dir.display().to_string(),
                    reason: format!("invalid package.json: {}", e),
                })?;

            if let Some(found) = package.main.and_then(|main| self.with_extensions(&dir.join(main))) {
                return Ok(Some(found));
            }
        }

        Ok(self
            .extensions
            .iter()
            .map(|ext| dir.join(format!("index{}", ext)))
            .find(|index| index.is_file())
            .map(|index| normalize(&index)))
    }

    /// Resolve a package from the nearest `node_modules` up the tree
    fn resolve_node_modules(&self, specifier: &str, from_dir: &Path) -> Result<Option<PathBuf>> {
        let (package_name, subpath) = parse_package_specifier(specifier);

        for dir in from_dir.ancestors() {
            let package_dir = dir.join("node_modules").join(package_name);
            if !package_dir.exists() {
                continue;
            }

            let found = match subpath {
                Some(sub) => self.resolve_file(&package_dir.join(sub))?,
                None => self.resolve_directory(&package_dir)?,
            };
            if found.is_some() {
                return Ok(found);
            }
        }

        Ok(None)
    }
}

impl PathResolver for CommonJsResolver {
    fn resolve_path(&self, specifier: &str, requester: Option<Requester<'_>>) -> Result<PathBuf> {
        if specifier.trim().is_empty() {
            return Err(CjsError::invalid_argument("specifier", "must not be empty"));
        }

        let from_dir = requester
            .and_then(|r| r.directory())
            .unwrap_or(self.base_dir.as_path());
        let candidate = from_dir.join(specifier);

        if Self::is_path_like(specifier) {
            return self
                .resolve_file(&candidate)?
                .ok_or_else(|| CjsError::module_not_found(specifier));
        }

        // Bare specifiers are tried next to the requester first
        if let Some(found) = self.resolve_file(&candidate)? {
            return Ok(found);
        }

        if self.node_modules {
            if let Some(found) = self.resolve_node_modules(specifier, from_dir)? {
                return Ok(found);
            }
        }

        Err(CjsError::module_not_found(specifier))
    }

    fn extension_registered(&mut self, extension: &str) {
        self.add_extension(extension);
    }
}

/// Split a package specifier into name and optional subpath
pub(crate) fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    if let Some(rest) = specifier.strip_prefix('@') {
        // Scoped package: @scope/name or @scope/name/subpath
        if let Some(slash_pos) = rest.find('/') {
            let after_scope = &rest[slash_pos + 1..];
            if let Some(subpath_pos) = after_scope.find('/') {
                let name_end = 1 + slash_pos + 1 + subpath_pos;
                return (&specifier[..name_end], Some(&specifier[name_end + 1..]));
            }
        }
        (specifier, None)
    } else if let Some(slash_pos) = specifier.find('/') {
        (&specifier[..slash_pos], Some(&specifier[slash_pos + 1..]))
    } else {
        (specifier, None)
    }
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(ext);
    PathBuf::from(name)
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// The part of package.json resolution looks at
#[derive(Debug, Deserialize)]
struct PackageJson {
    main: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn resolver(base: &Path) -> CommonJsResolver {
        CommonJsResolver::new(base, ["default", ".js", ".json"])
    }

    #[test]
    fn test_parse_package_specifier() {
        assert_eq!(parse_package_specifier("lodash"), ("lodash", None));
        assert_eq!(parse_package_specifier("lodash/get"), ("lodash", Some("get")));
        assert_eq!(parse_package_specifier("@types/node"), ("@types/node", None));
        assert_eq!(
            parse_package_specifier("@babel/core/lib/index"),
            ("@babel/core", Some("lib/index"))
        );
    }

    #[test]
    fn test_default_key_is_not_an_extension() {
        let resolver = resolver(Path::new("."));
        assert_eq!(resolver.extensions(), &[".js".to_string(), ".json".to_string()]);
    }

    #[test]
    fn test_dotted_extension() {
        assert_eq!(dotted_extension(Path::new("a/b.json")), ".json");
        assert_eq!(dotted_extension(Path::new("a/b")), "");
    }

    #[test]
    fn test_exact_match_wins_over_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("util"), "exact").unwrap();
        fs::write(dir.path().join("util.js"), "appended").unwrap();

        let resolved = resolver(dir.path()).resolve_path("./util", None).unwrap();
        assert_eq!(fs::read_to_string(resolved).unwrap(), "exact");
    }

    #[test]
    fn test_extensions_tried_in_registration_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("data.js"), "js").unwrap();
        fs::write(dir.path().join("data.json"), "{}").unwrap();

        let resolved = resolver(dir.path()).resolve_path("./data", None).unwrap();
        assert_eq!(dotted_extension(&resolved), ".js");

        let json_first = CommonJsResolver::new(dir.path(), [".json", ".js"]);
        let resolved = json_first.resolve_path("./data", None).unwrap();
        assert_eq!(dotted_extension(&resolved), ".json");
    }

    #[test]
    fn test_relative_to_requester_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib").join("helper.js"), "").unwrap();
        let requester_path = dir.path().join("lib").join("main.js");

        let requester = Requester {
            id: "./lib/main",
            location: Some(&requester_path),
        };
        let resolved = resolver(dir.path())
            .resolve_path("./helper", Some(requester))
            .unwrap();
        assert!(resolved.ends_with("lib/helper.js"));
    }

    #[test]
    fn test_directory_index_and_package_main() {
        let dir = tempdir().unwrap();
        let with_index = dir.path().join("plain");
        fs::create_dir(&with_index).unwrap();
        fs::write(with_index.join("index.js"), "").unwrap();

        let with_main = dir.path().join("pkg");
        fs::create_dir(&with_main).unwrap();
        fs::write(with_main.join("package.json"), r#"{ "main": "lib/entry" }"#).unwrap();
        fs::create_dir(with_main.join("lib")).unwrap();
        fs::write(with_main.join("lib").join("entry.js"), "").unwrap();

        let resolver = resolver(dir.path());
        assert!(resolver
            .resolve_path("./plain", None)
            .unwrap()
            .ends_with("plain/index.js"));
        assert!(resolver
            .resolve_path("./pkg", None)
            .unwrap()
            .ends_with("pkg/lib/entry.js"));
    }

    #[test]
    fn test_node_modules_walk() {
        let dir = tempdir().unwrap();
        let package = dir.path().join("node_modules").join("left-pad");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("index.js"), "").unwrap();
        let nested = dir.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();
        let requester_path = nested.join("main.js");

        let requester = Requester {
            id: "main",
            location: Some(&requester_path),
        };
        let resolved = resolver(dir.path())
            .resolve_path("left-pad", Some(requester))
            .unwrap();
        assert!(resolved.ends_with("node_modules/left-pad/index.js"));

        let disabled = resolver(dir.path()).with_node_modules(false);
        assert!(disabled.resolve_path("left-pad", Some(requester)).is_err());
    }

    #[test]
    fn test_missing_module() {
        let dir = tempdir().unwrap();
        let err = resolver(dir.path()).resolve_path("./nope", None).unwrap_err();
        assert!(matches!(err, CjsError::ModuleNotFound(name) if name == "./nope"));
    }

    #[test]
    fn test_malformed_package_json() {
        let dir = tempdir().unwrap();
        let package = dir.path().join("broken");
        fs::create_dir(&package).unwrap();
        fs::write(package.join("package.json"), "{ main: ").unwrap();
        fs::write(package.join("index.js"), "").unwrap();

        let err = resolver(dir.path()).resolve_path("./broken", None).unwrap_err();
        assert!(matches!(err, CjsError::ModuleResolution { .. }));
    }

    #[test]
    fn test_registered_extension_joins_candidates() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let mut resolver = resolver(dir.path());
        assert!(resolver.resolve_path("./notes", None).is_err());

        resolver.extension_registered(".txt");
        assert!(resolver.resolve_path("./notes", None).is_ok());
    }
}
