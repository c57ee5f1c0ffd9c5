// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conversions between JSON values and Redis wire values.

use doccache_backend::Error;
use serde_json::{Map, Number, Value};

/// Renders a script argument the way Redis clients send it: strings verbatim,
/// numbers and booleans as their text, everything else as JSON text.
pub(crate) fn script_arg(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Converts a script reply into JSON.
///
/// Nil becomes `None`. Nil items inside arrays become `null`.
pub(crate) fn reply_to_json(reply: redis::Value) -> Result<Option<Value>, Error> {
    Ok(match reply {
        redis::Value::Nil => None,
        other => Some(reply_item(other)?),
    })
}

fn reply_item(reply: redis::Value) -> Result<Value, Error> {
    Ok(match reply {
        redis::Value::Nil => Value::Null,
        redis::Value::Int(n) => Value::from(n),
        redis::Value::Okay => Value::String("OK".to_string()),
        redis::Value::SimpleString(text) => Value::String(text),
        redis::Value::BulkString(bytes) => Value::String(String::from_utf8(bytes).map_err(Error::backend)?),
        redis::Value::Boolean(flag) => Value::Bool(flag),
        redis::Value::Double(n) => Number::from_f64(n).map_or(Value::Null, Value::Number),
        redis::Value::Array(items) | redis::Value::Set(items) => {
            Value::Array(items.into_iter().map(reply_item).collect::<Result<_, _>>()?)
        }
        redis::Value::Map(pairs) => {
            let mut map = Map::with_capacity(pairs.len());
            for (key, value) in pairs {
                let key = match reply_item(key)? {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                map.insert(key, reply_item(value)?);
            }
            Value::Object(map)
        }
        redis::Value::ServerError(error) => return Err(Error::backend(format!("script failed: {error:?}"))),
        other => return Err(Error::backend(format!("unsupported script reply: {other:?}"))),
    })
}

/// Decodes a stored JSON document.
pub(crate) fn decode_stored(text: &str) -> Result<Value, Error> {
    serde_json::from_str(text).map_err(Error::backend)
}
