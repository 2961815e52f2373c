// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS require() implementation
//!
//! Builds the script-visible side of a module: the wrapper source, the
//! `module` object and the `require` functions.

use crate::module_system::loader::{ModuleHandle, ModuleLoader};
use crate::module_system::module::ModuleId;
use boa_engine::object::builtins::JsFunction;
use boa_engine::object::{FunctionObjectBuilder, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::realm::Realm;
use boa_engine::{
    js_string, Context, JsNativeError, JsObject, JsResult, JsString, JsValue, NativeFunction,
};
use boa_gc::{Finalize, Trace};
use std::rc::{Rc, Weak};

/// Parameters of the module function wrapper, in call order
pub const WRAPPER_PARAMS: [&str; 5] = ["module", "exports", "__dirname", "require", "__filename"];

/// Compile module source into a function taking [`WRAPPER_PARAMS`].
///
/// The body goes through the `Function` constructor, which parses it on its
/// own. Running it does not touch the environment of the calling script.
pub(crate) fn compile_wrapper(source: &str, ctx: &mut Context) -> JsResult<JsObject> {
    let mut args: Vec<JsValue> = WRAPPER_PARAMS
        .iter()
        .map(|param| JsString::from(*param).into())
        .collect();
    args.push(JsString::from(source).into());

    let function = ctx.intrinsics().constructors().function().constructor();
    function.construct(&args, None, ctx)
}

/// What a native closure needs to reach its module from script land.
///
/// The loader is held weakly so functions stored in the script heap never
/// keep the cache alive.
#[derive(Clone, Trace, Finalize)]
pub(crate) struct ModuleRef {
    #[unsafe_ignore_trace]
    loader: Weak<ModuleLoader>,
    #[unsafe_ignore_trace]
    module: Option<ModuleId>,
}

impl ModuleRef {
    pub(crate) fn new(loader: Weak<ModuleLoader>, module: Option<ModuleId>) -> Self {
        Self { loader, module }
    }

    fn loader(&self) -> JsResult<Rc<ModuleLoader>> {
        self.loader.upgrade().ok_or_else(|| {
            JsNativeError::error()
                .with_message("module runtime is no longer alive")
                .into()
        })
    }

    fn module(&self) -> JsResult<ModuleId> {
        self.module.ok_or_else(|| {
            JsNativeError::error()
                .with_message("not called from a module")
                .into()
        })
    }
}

/// The `module` object handed to a module body.
///
/// `exports` is an accessor pair over the record, so assignments from the
/// body are visible to cyclic requires immediately.
pub(crate) fn module_object(handle: &ModuleHandle, ctx: &mut Context) -> JsResult<JsObject> {
    let target = handle.module_ref();
    let realm = ctx.realm().clone();

    let get_exports = function(
        &realm,
        "exports",
        0,
        NativeFunction::from_copy_closure_with_captures(exports_getter, target.clone()),
    );
    let set_exports = function(
        &realm,
        "exports",
        1,
        NativeFunction::from_copy_closure_with_captures(exports_setter, target.clone()),
    );
    let get_loaded = function(
        &realm,
        "loaded",
        0,
        NativeFunction::from_copy_closure_with_captures(loaded_getter, target),
    );

    let id = JsString::from(handle.id().as_str());
    let filename = handle
        .location()
        .map(|p| JsValue::from(JsString::from(p.display().to_string().as_str())))
        .unwrap_or_default();

    Ok(ObjectInitializer::new(ctx)
        .property(js_string!("id"), id, Attribute::ENUMERABLE)
        .property(js_string!("filename"), filename, Attribute::ENUMERABLE)
        .property(js_string!("isMain"), handle.is_main(), Attribute::ENUMERABLE)
        .accessor(
            js_string!("exports"),
            Some(get_exports),
            Some(set_exports),
            Attribute::ENUMERABLE | Attribute::CONFIGURABLE,
        )
        .accessor(
            js_string!("loaded"),
            Some(get_loaded),
            None,
            Attribute::ENUMERABLE | Attribute::CONFIGURABLE,
        )
        .build())
}

/// The `require` passed to a module body, bound to that module.
pub(crate) fn module_require(handle: &ModuleHandle, ctx: &mut Context) -> JsResult<JsFunction> {
    let target = handle.module_ref();
    let realm = ctx.realm().clone();

    let require = function(
        &realm,
        "require",
        1,
        NativeFunction::from_copy_closure_with_captures(require_body, target.clone()),
    );
    let resolve = function(
        &realm,
        "resolve",
        1,
        NativeFunction::from_copy_closure_with_captures(resolve_body, target),
    );
    require.set(js_string!("resolve"), resolve, false, ctx)?;

    Ok(require)
}

/// The top-level `require` global; loads without a parent.
pub(crate) fn global_require(loader: &ModuleLoader) -> NativeFunction {
    NativeFunction::from_copy_closure_with_captures(require_body, ModuleRef::new(loader.weak(), None))
}

fn function(realm: &Realm, name: &str, length: usize, body: NativeFunction) -> JsFunction {
    FunctionObjectBuilder::new(realm, body)
        .name(JsString::from(name))
        .length(length)
        .build()
}

fn specifier_arg(args: &[JsValue]) -> JsResult<String> {
    args.first()
        .and_then(JsValue::as_string)
        .map(JsString::to_std_string_escaped)
        .ok_or_else(|| {
            JsNativeError::typ()
                .with_message("The \"id\" argument must be of type string")
                .into()
        })
}

fn require_body(_this: &JsValue, args: &[JsValue], target: &ModuleRef, ctx: &mut Context) -> JsResult<JsValue> {
    let specifier = specifier_arg(args)?;
    target
        .loader()?
        .load(&specifier, target.module, ctx)
        .map_err(|err| err.into_js_error(ctx))
}

fn resolve_body(_this: &JsValue, args: &[JsValue], target: &ModuleRef, ctx: &mut Context) -> JsResult<JsValue> {
    let specifier = specifier_arg(args)?;
    let location = target
        .loader()?
        .resolve(&specifier, target.module)
        .map_err(|err| err.into_js_error(ctx))?;
    Ok(JsString::from(location.display().to_string().as_str()).into())
}

fn exports_getter(_this: &JsValue, _args: &[JsValue], target: &ModuleRef, _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(target.loader()?.exports(target.module()?))
}

fn exports_setter(_this: &JsValue, args: &[JsValue], target: &ModuleRef, _ctx: &mut Context) -> JsResult<JsValue> {
    let value = args.first().cloned().unwrap_or_default();
    target.loader()?.set_exports(target.module()?, value);
    Ok(JsValue::undefined())
}

fn loaded_getter(_this: &JsValue, _args: &[JsValue], target: &ModuleRef, _ctx: &mut Context) -> JsResult<JsValue> {
    let loaded = target
        .loader()?
        .state(target.module()?)
        .is_some_and(|state| state.is_loaded());
    Ok(loaded.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_binds_params_in_order() {
        let mut ctx = Context::default();
        let function = compile_wrapper(
            "return [module, exports, __dirname, require, __filename].join(',');",
            &mut ctx,
        )
        .unwrap();
        assert!(function.is_callable());

        let args: Vec<JsValue> = ["m", "e", "d", "r", "f"]
            .iter()
            .map(|a| JsString::from(*a).into())
            .collect();
        let joined = function.call(&JsValue::undefined(), &args, &mut ctx).unwrap();
        assert_eq!(joined.as_string().unwrap().to_std_string_escaped(), "m,e,d,r,f");
    }

    #[test]
    fn test_line_comment_at_end_does_not_swallow_wrapper() {
        let mut ctx = Context::default();
        let function = compile_wrapper("exports.a = 1; // trailing", &mut ctx).unwrap();
        assert!(function.is_callable());
    }

    #[test]
    fn test_body_cannot_close_the_wrapper() {
        let mut ctx = Context::default();
        let result = compile_wrapper("module.exports = 3; }); (function(){", &mut ctx);
        assert!(result.is_err());
    }
}
