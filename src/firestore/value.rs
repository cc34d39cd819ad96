//! Conversion between serde-serializable Rust values and Firestore's
//! typed-value wire format.

use super::models::{ArrayValue, MapValue, Value, ValueType};
use super::FirestoreError;
use serde::de::Error as DeError;
use serde::ser::Error as SerError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::HashMap;

pub fn fields_to_json(fields: HashMap<String, Value>) -> Result<Json, FirestoreError> {
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert(key, value_to_json(value)?);
    }
    Ok(Json::Object(map))
}

pub fn value_to_json(value: Value) -> Result<Json, FirestoreError> {
    Ok(match value.value_type {
        ValueType::StringValue(s) => Json::String(s),
        ValueType::IntegerValue(s) => {
            let i: i64 = s.parse().map_err(|e| {
                <serde_json::Error as DeError>::custom(format!(
                    "integer field is not a valid i64 ('{}'): {}",
                    s, e
                ))
            })?;
            Json::Number(i.into())
        }
        ValueType::DoubleValue(d) => serde_json::Number::from_f64(d)
            .map(Json::Number)
            .ok_or_else(|| {
                <serde_json::Error as DeError>::custom(format!("non-finite double: {}", d))
            })?,
        ValueType::BooleanValue(b) => Json::Bool(b),
        ValueType::MapValue(m) => fields_to_json(m.fields)?,
        ValueType::ArrayValue(a) => Json::Array(
            a.values
                .into_iter()
                .map(value_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        ValueType::NullValue(()) => Json::Null,
        ValueType::TimestampValue(s)
        | ValueType::BytesValue(s)
        | ValueType::ReferenceValue(s) => Json::String(s),
    })
}

pub fn serializable_to_fields<T: Serialize>(
    value: &T,
) -> Result<HashMap<String, Value>, FirestoreError> {
    match serde_json::to_value(value)? {
        Json::Object(map) => {
            let mut fields = HashMap::new();
            for (k, v) in map {
                fields.insert(k, json_to_value(v)?);
            }
            Ok(fields)
        }
        _ => Err(FirestoreError::SerializationError(SerError::custom(
            "only maps/structs can be stored as documents",
        ))),
    }
}

pub fn json_to_value(value: Json) -> Result<Value, FirestoreError> {
    let value_type = match value {
        Json::Null => ValueType::NullValue(()),
        Json::Bool(b) => ValueType::BooleanValue(b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                ValueType::IntegerValue(i.to_string())
            } else if let Some(f) = n.as_f64() {
                ValueType::DoubleValue(f)
            } else {
                return Err(FirestoreError::SerializationError(SerError::custom(
                    format!("unsupported number: {}", n),
                )));
            }
        }
        Json::String(s) => ValueType::StringValue(s),
        Json::Array(items) => ValueType::ArrayValue(ArrayValue {
            values: items
                .into_iter()
                .map(json_to_value)
                .collect::<Result<Vec<_>, _>>()?,
        }),
        Json::Object(map) => {
            let mut fields = HashMap::new();
            for (k, v) in map {
                fields.insert(k, json_to_value(v)?);
            }
            ValueType::MapValue(MapValue { fields })
        }
    };
    Ok(Value { value_type })
}

pub fn fields_to_typed<T: DeserializeOwned>(
    fields: HashMap<String, Value>,
) -> Result<T, FirestoreError> {
    let json = fields_to_json(fields)?;
    Ok(serde_json::from_value(json)?)
}
