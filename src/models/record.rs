//! Boundary between untyped backend rows and the typed entities of the app.
//! Every row that enters the system goes through [`Record::from_row`].

use crate::backend::Row;
use crate::errors::{AppError, AppResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub trait Record: Serialize + DeserializeOwned {
    /// Backend table holding this entity.
    const TABLE: &'static str;

    fn from_row(row: Row) -> AppResult<Self> {
        serde_json::from_value(Value::Object(row))
            .map_err(|e| AppError::invalid_record(Self::TABLE, e.to_string()))
    }

    fn to_row(&self) -> AppResult<Row> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(AppError::invalid_record(
                Self::TABLE,
                format!("expected an object, got {other}"),
            )),
        }
    }
}

pub fn from_rows<T: Record>(rows: Vec<Row>) -> AppResult<Vec<T>> {
    rows.into_iter().map(T::from_row).collect()
}
