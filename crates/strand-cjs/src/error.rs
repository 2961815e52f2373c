// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the CommonJS module system

use boa_engine::{js_string, Context, JsError, JsNativeError, JsString};
use thiserror::Error;

/// Result type for module system operations
pub type Result<T> = std::result::Result<T, CjsError>;

/// Errors that can occur while resolving, loading or executing modules
#[derive(Debug, Error)]
pub enum CjsError {
    /// Empty or otherwise unusable argument
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Argument name
        name: &'static str,
        /// Reason for rejection
        reason: String,
    },

    /// Module not found
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    /// Module resolution error
    #[error("Error resolving module '{module}': {reason}")]
    ModuleResolution {
        /// Module specifier
        module: String,
        /// Reason for failure
        reason: String,
    },

    /// Neither the extension nor the `default` key has a loader
    #[error("No loader registered for extension '{extension}' and no default loader")]
    NoLoader {
        /// Extension of the resolved location
        extension: String,
    },

    /// A module with this id is already cached
    #[error("Module '{0}' is already registered")]
    DuplicateModule(String),

    /// Referenced module id is not in the cache
    #[error("Module '{0}' is not loaded")]
    UnknownModule(String),

    /// Exception raised by script code, carried unchanged
    #[error("{0}")]
    Script(#[from] JsError),

    /// File system error
    #[error("File system error: {0}")]
    Fs(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CjsError {
    /// Create an argument error
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Create a module not found error
    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound(module.into())
    }

    /// Returns true if the error came out of a module body.
    pub fn is_script_error(&self) -> bool {
        matches!(self, Self::Script(_))
    }

    /// Node-style `code` of the error, if it has one
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidArgument { .. } => Some("ERR_INVALID_ARG_VALUE"),
            Self::ModuleNotFound(_) => Some("MODULE_NOT_FOUND"),
            Self::ModuleResolution { .. } => Some("ERR_MODULE_RESOLUTION"),
            Self::NoLoader { .. } => Some("ERR_NO_LOADER"),
            Self::DuplicateModule(_) => Some("ERR_DUPLICATE_MODULE"),
            Self::UnknownModule(_) => Some("ERR_UNKNOWN_MODULE"),
            Self::Script(_) | Self::Fs(_) | Self::JsonParse(_) | Self::Config(_) => None,
        }
    }

    /// Convert into an exception that can be thrown back into script code.
    ///
    /// Script exceptions pass through untouched so `try`/`catch` in a
    /// requiring module sees the original thrown value. Anything else
    /// becomes an `Error` (a `TypeError` for bad arguments) carrying
    /// [`code`](Self::code) as its `code` property.
    pub fn into_js_error(self, ctx: &mut Context) -> JsError {
        if let Self::Script(err) = self {
            return err;
        }

        let native = match self {
            Self::InvalidArgument { .. } => JsNativeError::typ(),
            _ => JsNativeError::error(),
        }
        .with_message(self.to_string());
        let code = self.code();

        let error = native.to_opaque(ctx);
        if let Some(code) = code {
            if error.set(js_string!("code"), JsString::from(code), false, ctx).is_err() {
                return native.into();
            }
        }
        JsError::from_opaque(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::JsValue;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            CjsError::module_not_found("./missing").to_string(),
            "Cannot find module './missing'"
        );
        assert_eq!(
            CjsError::DuplicateModule("fs".to_string()).to_string(),
            "Module 'fs' is already registered"
        );
        assert_eq!(
            CjsError::NoLoader {
                extension: ".txt".to_string()
            }
            .to_string(),
            "No loader registered for extension '.txt' and no default loader"
        );
    }

    #[test]
    fn test_script_errors_are_flagged() {
        let err: CjsError = JsError::from(JsNativeError::typ().with_message("boom")).into();
        assert!(err.is_script_error());
        assert!(!CjsError::module_not_found("x").is_script_error());
    }

    #[test]
    fn test_thrown_error_carries_code() {
        let mut ctx = Context::default();
        let err = CjsError::module_not_found("./nope").into_js_error(&mut ctx);

        let object = err.as_opaque().unwrap().as_object().unwrap().clone();
        let code = object.get(js_string!("code"), &mut ctx).unwrap();
        let message = object.get(js_string!("message"), &mut ctx).unwrap();
        assert_eq!(code.as_string().unwrap().to_std_string_escaped(), "MODULE_NOT_FOUND");
        assert_eq!(
            message.as_string().unwrap().to_std_string_escaped(),
            "Cannot find module './nope'"
        );
    }

    #[test]
    fn test_script_error_is_rethrown_unchanged() {
        let mut ctx = Context::default();
        let original = JsError::from_opaque(JsValue::from(7));
        let err = CjsError::Script(original).into_js_error(&mut ctx);
        assert_eq!(err.as_opaque().and_then(JsValue::as_number), Some(7.0));
    }
}
