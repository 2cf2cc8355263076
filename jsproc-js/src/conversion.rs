//! JSON conversion between `serde_json` values and script values

use crate::JsExecutionError;
use boa_engine::{js_string, property::PropertyKey, Context as BoaContext, JsObject, JsString, JsValue};
use serde_json::Value as JsonValue;
use tracing::trace;

/// Look up `JSON.<method>` as a callable
fn json_method(context: &mut BoaContext, method: &str) -> Result<JsObject, JsExecutionError> {
    let json = context
        .global_object()
        .get(js_string!("JSON"), context)
        .map_err(|e| JsExecutionError::ContextError(format!("Failed to read JSON global: {}", e)))?;

    let method_value = json
        .as_object()
        .ok_or_else(|| JsExecutionError::ContextError("JSON global is not an object".to_string()))?
        .get(PropertyKey::from(JsString::from(method)), context)
        .map_err(|e| JsExecutionError::ContextError(format!("Failed to read JSON.{}: {}", method, e)))?;

    method_value
        .as_callable()
        .cloned()
        .ok_or_else(|| JsExecutionError::ContextError(format!("JSON.{} is not a function", method)))
}

/// Convert a script value to JSON
///
/// Values `JSON.stringify` cannot represent (`undefined`, functions, symbols)
/// come back as `null`.
pub fn js_to_json(context: &mut BoaContext, value: JsValue) -> Result<JsonValue, JsExecutionError> {
    trace!("Converting script value to JSON");
    let stringify = json_method(context, "stringify")?;

    let text = stringify
        .call(&JsValue::undefined(), &[value], context)
        .map_err(|e| JsExecutionError::OutputError(format!("Failed to stringify value: {}", e)))?;

    if text.is_undefined() {
        return Ok(JsonValue::Null);
    }

    let text = text
        .to_string(context)
        .map_err(|e| JsExecutionError::OutputError(e.to_string()))?
        .to_std_string_escaped();

    serde_json::from_str(&text).map_err(|e| JsExecutionError::OutputError(e.to_string()))
}

/// Convert JSON into a script value owned by `context`
pub fn json_to_js(context: &mut BoaContext, value: &JsonValue) -> Result<JsValue, JsExecutionError> {
    trace!("Converting JSON to script value");
    let text = serde_json::to_string(value).map_err(|e| JsExecutionError::InputError(e.to_string()))?;
    let parse = json_method(context, "parse")?;

    parse
        .call(&JsValue::undefined(), &[JsValue::from(JsString::from(text.as_str()))], context)
        .map_err(|e| JsExecutionError::InputError(format!("Failed to parse input JSON: {}", e)))
}
