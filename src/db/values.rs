//! Conversions between JSON values (the backend row format) and SQLite values.

use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Map, Number, Value};

pub fn json_to_sql(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        // nested structures are stored as their JSON text
        other => SqlValue::Text(other.to_string()),
    }
}

pub fn sql_to_json(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|x| Value::Number((*x).into())).collect()),
    }
}

/// Read every column of the current row into a JSON object.
pub fn row_to_json(row: &rusqlite::Row<'_>) -> rusqlite::Result<Map<String, Value>> {
    let stmt = row.as_ref();
    let mut out = Map::new();
    for (i, name) in stmt.column_names().iter().enumerate() {
        out.insert(name.to_string(), sql_to_json(row.get_ref(i)?));
    }
    Ok(out)
}

/// Loose equality used by change-feed filters: `1 == true`, `"a" == "a"`,
/// `1 == 1.0`.
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Number(n)) | (Value::Number(n), Value::Bool(x)) => {
            n.as_i64() == Some(i64::from(*x))
        }
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booleans_are_stored_as_integers() {
        assert_eq!(json_to_sql(&json!(true)), SqlValue::Integer(1));
        assert_eq!(json_to_sql(&json!(false)), SqlValue::Integer(0));
    }

    #[test]
    fn nested_values_become_text() {
        assert_eq!(
            json_to_sql(&json!({"os": "mobile"})),
            SqlValue::Text("{\"os\":\"mobile\"}".into())
        );
    }

    #[test]
    fn loose_equality_bridges_bool_and_int() {
        assert!(loosely_equal(&json!(1), &json!(true)));
        assert!(loosely_equal(&json!("u1"), &json!("u1")));
        assert!(!loosely_equal(&json!("u1"), &json!("u2")));
        assert!(loosely_equal(&json!(2), &json!(2.0)));
    }
}
