use crate::types::{is_whole_i64, SqlType};
use bytes::{BufMut, BytesMut};
use serde_json::Value;
use std::error::Error;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

/// A JSON value coerced to the storage form of its column
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Text(String),
    Json(Value),
}

impl SqlValue {
    /// Coerce a row value (or its absence) for a column of type `sql_type`.
    ///
    /// Values that do not fit the column (only possible with sampled
    /// inference) are passed through in their natural form; binding then
    /// converts or rejects them against the column's declared type.
    pub fn coerce(value: Option<&Value>, sql_type: SqlType) -> SqlValue {
        let value = match value {
            None | Some(Value::Null) => return SqlValue::Null,
            Some(v) => v,
        };

        match (sql_type, value) {
            (SqlType::Integer, Value::Number(n)) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => match n.as_f64() {
                    Some(f) if is_whole_i64(f) => SqlValue::Integer(f as i64),
                    Some(f) => SqlValue::Double(f),
                    None => SqlValue::Text(n.to_string()),
                },
            },
            (SqlType::Double, Value::Number(n)) => match n.as_f64() {
                Some(f) => SqlValue::Double(f),
                None => SqlValue::Text(n.to_string()),
            },
            (SqlType::Text, Value::String(s)) => SqlValue::Text(s.clone()),
            (SqlType::Text, Value::Number(_) | Value::Bool(_)) => SqlValue::Text(value.to_string()),
            (SqlType::Jsonb, Value::String(s)) => SqlValue::Json(json_from_text(s)),
            (SqlType::Jsonb, _) => SqlValue::Json(value.clone()),
            _ => SqlValue::natural(value),
        }
    }

    /// The storage form a value has on its own, ignoring any column type
    fn natural(value: &Value) -> SqlValue {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => n.as_f64().map(SqlValue::Double).unwrap_or_else(|| SqlValue::Text(n.to_string())),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlValue::Json(value.clone()),
        }
    }
}

/// A string may already carry JSON text; otherwise it becomes a JSON string.
fn json_from_text(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

/// Anything `String` binds to: TEXT, VARCHAR, BPCHAR, NAME and friends
fn is_text(ty: &Type) -> bool {
    <String as ToSql>::accepts(ty)
}

impl ToSql for SqlValue {
    /// Bind against the type of the target column, not the inferred one.
    ///
    /// A pre-existing table may declare narrower or different column types than
    /// this import inferred, so every lossless conversion is made here. Anything
    /// else goes through the inner type's own check and fails with a type error
    /// instead of writing bad bytes.
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Integer(v) => integer_to_sql(*v, ty, out),
            SqlValue::Double(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else if is_text(ty) {
                    v.to_string().to_sql(ty, out)
                } else {
                    v.to_sql_checked(ty, out)
                }
            }
            SqlValue::Boolean(v) => {
                if is_text(ty) {
                    v.to_string().to_sql(ty, out)
                } else {
                    v.to_sql_checked(ty, out)
                }
            }
            SqlValue::Text(v) => {
                if *ty == Type::JSON || *ty == Type::JSONB {
                    json_from_text(v).to_sql(ty, out)
                } else {
                    v.to_sql_checked(ty, out)
                }
            }
            SqlValue::Json(v) => {
                if is_text(ty) {
                    v.to_string().to_sql(ty, out)
                } else {
                    v.to_sql_checked(ty, out)
                }
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn integer_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    if *ty == Type::INT2 {
        i16::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::FLOAT4 {
        (v as f32).to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        (v as f64).to_sql(ty, out)
    } else if *ty == Type::NUMERIC {
        write_numeric(v, out);
        Ok(IsNull::No)
    } else if is_text(ty) {
        v.to_string().to_sql(ty, out)
    } else {
        v.to_sql_checked(ty, out)
    }
}

/// NUMERIC wire format: ndigits, weight, sign, dscale, then base-10000 digits
/// from most significant, with trailing zero digits dropped.
fn write_numeric(v: i64, out: &mut BytesMut) {
    let mut rest = v.unsigned_abs();
    let mut digits = Vec::new();
    while rest > 0 {
        digits.push((rest % 10_000) as i16);
        rest /= 10_000;
    }
    let weight = digits.len().saturating_sub(1) as i16;
    digits.reverse();
    while digits.last() == Some(&0) {
        digits.pop();
    }

    out.put_i16(digits.len() as i16);
    out.put_i16(weight);
    out.put_u16(if v < 0 { 0x4000 } else { 0x0000 });
    out.put_i16(0);
    for digit in digits {
        out.put_i16(digit);
    }
}
