//! Table-level façades over the board's Postgres schema. Every function
//! takes the pool explicitly; nothing here holds connection state.

pub mod actions;
pub mod metrics;
pub mod notes;
pub mod questions;
pub mod responses;
pub mod transcripts;

use serde::de::DeserializeOwned;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row};

use crate::error::{ServiceError, ServiceResult};
use crate::models::Pillar;

pub(crate) fn column<'r, T>(row: &'r PgRow, name: &'static str) -> ServiceResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(ServiceError::backend("failed to read stored row"))
}

pub(crate) fn pillar_column(row: &PgRow) -> ServiceResult<Pillar> {
    let raw: String = column(row, "pillar")?;
    Ok(raw.parse::<Pillar>()?)
}

pub(crate) fn decode_json<T: DeserializeOwned>(raw: &str, name: &'static str) -> ServiceResult<T> {
    serde_json::from_str(raw).map_err(ServiceError::decode(name))
}

pub(crate) fn encode_json<T: serde::Serialize>(value: &T, name: &'static str) -> ServiceResult<String> {
    serde_json::to_string(value).map_err(ServiceError::decode(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_columns_name_the_column() {
        let err = decode_json::<Vec<String>>("[\"ok\", ", "key_points").unwrap_err();
        assert!(matches!(err, ServiceError::Decode { column: "key_points", .. }));
    }

    #[test]
    fn json_columns_decode_arrays() {
        let points: Vec<String> = decode_json(r#"["a","b"]"#, "key_points").unwrap();
        assert_eq!(points, vec!["a".to_string(), "b".to_string()]);
    }
}
