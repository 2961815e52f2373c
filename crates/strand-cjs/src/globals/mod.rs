// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host globals installed into every runtime
//!
//! Implements:
//! - `require` - top-level module loading without a parent module
//! - `print` - write values to stdout

pub mod print;

use crate::config::RuntimeConfig;
use crate::module_system::{global_require, ModuleLoader};
use boa_engine::{js_string, Context, JsResult, NativeFunction};

/// Install the host globals into `context`
pub fn install(context: &mut Context, loader: &ModuleLoader, config: &RuntimeConfig) -> JsResult<()> {
    context.register_global_callable(js_string!("require"), 1, global_require(loader))?;

    if config.print_global {
        context.register_global_callable(
            js_string!("print"),
            0,
            NativeFunction::from_fn_ptr(print::print),
        )?;
    }

    Ok(())
}
