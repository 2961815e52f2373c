// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `print` global

use boa_engine::{Context, JsResult, JsValue};
use std::io::Write;

/// Implementation of print(...args)
pub fn print(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let line = join_args(args);

    let mut stdout = std::io::stdout().lock();
    // Write failures are ignored
    let _ = writeln!(stdout, "{}", line);

    Ok(JsValue::undefined())
}

/// Join arguments with spaces; strings print raw, everything else as
/// the engine displays it
pub fn join_args(args: &[JsValue]) -> String {
    args.iter().map(format_value).collect::<Vec<_>>().join(" ")
}

/// Format a single value for output
pub fn format_value(value: &JsValue) -> String {
    match value.as_string() {
        Some(s) => s.to_std_string_escaped(),
        None => value.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::JsString;

    #[test]
    fn test_join_args() {
        let args = [
            JsValue::from(JsString::from("count:")),
            JsValue::from(3),
            JsValue::from(true),
            JsValue::undefined(),
        ];
        assert_eq!(join_args(&args), "count: 3 true undefined");
    }

    #[test]
    fn test_strings_are_not_quoted() {
        assert_eq!(format_value(&JsValue::from(JsString::from("a b"))), "a b");
    }
}
