//! Schema introspection queries.
//!
//! Databases and tables are read from `information_schema` rather than
//! `SHOW` statements so the ordering and the system-schema filter are applied
//! by the server.

use crate::error::DbResult;
use crate::models::TableRef;
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::Row;

pub(crate) mod queries {
    pub const LIST_DATABASES: &str = r#"
        SELECT CONVERT(SCHEMA_NAME USING utf8mb4) AS SCHEMA_NAME
        FROM information_schema.SCHEMATA
        WHERE SCHEMA_NAME NOT IN ('information_schema', 'performance_schema', 'mysql', 'sys')
        ORDER BY SCHEMA_NAME
        "#;

    pub const LIST_TABLES_IN_SCHEMA: &str = r#"
        SELECT
            CONVERT(TABLE_SCHEMA USING utf8mb4) AS TABLE_SCHEMA,
            CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ?
        ORDER BY TABLE_NAME
        "#;

    pub const LIST_TABLES_ALL_SCHEMAS: &str = r#"
        SELECT
            CONVERT(TABLE_SCHEMA USING utf8mb4) AS TABLE_SCHEMA,
            CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA NOT IN ('information_schema', 'performance_schema', 'mysql', 'sys')
        ORDER BY TABLE_SCHEMA, TABLE_NAME
        "#;
}

/// Safely get a string from a MySQL row.
/// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
fn get_string(row: &MySqlRow, column: &str) -> String {
    row.try_get::<String, _>(column)
        .ok()
        .or_else(|| {
            row.try_get::<Vec<u8>, _>(column)
                .ok()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        })
        .unwrap_or_default()
}

/// Non-system databases, ordered by name.
pub async fn list_databases(conn: &mut MySqlConnection) -> DbResult<Vec<String>> {
    let rows = sqlx::query(queries::LIST_DATABASES)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.iter().map(|row| get_string(row, "SCHEMA_NAME")).collect())
}

/// Tables of `database`, or of every non-system schema when no database is selected.
pub async fn list_tables(
    conn: &mut MySqlConnection,
    database: Option<&str>,
) -> DbResult<Vec<TableRef>> {
    let rows = match database {
        Some(name) => {
            sqlx::query(queries::LIST_TABLES_IN_SCHEMA)
                .bind(name)
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            sqlx::query(queries::LIST_TABLES_ALL_SCHEMAS)
                .fetch_all(&mut *conn)
                .await?
        }
    };

    Ok(rows
        .iter()
        .map(|row| TableRef::new(get_string(row, "TABLE_SCHEMA"), get_string(row, "TABLE_NAME")))
        .collect())
}
