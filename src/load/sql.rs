//! Statement text for the load. Only identifiers are ever spliced into SQL;
//! values always travel as bind parameters.

use crate::types::Schema;

/// Double-quote an identifier, doubling any embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` with a synthetic serial primary key followed
/// by one column per schema entry.
pub fn create_table(table: &str, primary_key: &str, schema: &Schema) -> String {
    let mut columns = Vec::with_capacity(schema.len() + 1);
    columns.push(format!("{} SERIAL PRIMARY KEY", quote_ident(primary_key)));
    columns.extend(
        schema
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type.ddl())),
    );

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        columns.join(", ")
    )
}

/// Parameterized single-row insert covering every schema column in order
pub fn insert_row(table: &str, schema: &Schema) -> String {
    let names: Vec<String> = schema.columns().iter().map(|c| quote_ident(&c.name)).collect();
    let placeholders: Vec<String> = (1..=schema.len()).map(|i| format!("${i}")).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnSpec, SqlType};

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnSpec {
                name: "id".to_string(),
                sql_type: SqlType::Integer,
                source_key: "id".to_string(),
            },
            ColumnSpec {
                name: "score".to_string(),
                sql_type: SqlType::Double,
                source_key: "score".to_string(),
            },
            ColumnSpec {
                name: "meta".to_string(),
                sql_type: SqlType::Jsonb,
                source_key: "meta".to_string(),
            },
        ])
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("My Table"), "\"My Table\"");
        assert_eq!(quote_ident("a\"; DROP TABLE x; --"), "\"a\"\"; DROP TABLE x; --\"");
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            create_table("events", "_generated_id", &schema()),
            "CREATE TABLE IF NOT EXISTS \"events\" (\"_generated_id\" SERIAL PRIMARY KEY, \
             \"id\" BIGINT, \"score\" DOUBLE PRECISION, \"meta\" JSONB)"
        );
    }

    #[test]
    fn test_insert_row() {
        assert_eq!(
            insert_row("events", &schema()),
            "INSERT INTO \"events\" (\"id\", \"score\", \"meta\") VALUES ($1, $2, $3)"
        );
    }
}
