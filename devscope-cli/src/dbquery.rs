use std::time::Duration;

use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::{MySqlPool, PgPool, Row as _};
use thiserror::Error;

use devscope_core::dbkind::{ConnectionSpec, SqlFlavor};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("invalid identifier: {0}")]
    BadIdentifier(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub row_count: i64,
    pub column_count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// One fetched page of a table: column metadata plus rows with every value
/// rendered to text server-side (None = SQL NULL).
#[derive(Clone, Debug)]
pub struct TablePage {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<Option<String>>>,
    pub page: usize,
}

/// A live connection pool to a browsed database. Owned by the table
/// browser sub-state and explicitly closed when it exits.
#[derive(Clone)]
pub enum DbHandle {
    Postgres(PgPool),
    MySql(MySqlPool),
}

impl DbHandle {
    pub async fn connect(spec: &ConnectionSpec) -> Result<Self, DbError> {
        let dsn = spec.dsn();
        match spec.flavor {
            SqlFlavor::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(2)
                    .acquire_timeout(CONNECT_TIMEOUT)
                    .connect(&dsn)
                    .await?;
                Ok(DbHandle::Postgres(pool))
            }
            SqlFlavor::MySql => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(2)
                    .acquire_timeout(CONNECT_TIMEOUT)
                    .connect(&dsn)
                    .await?;
                Ok(DbHandle::MySql(pool))
            }
        }
    }

    pub async fn close(self) {
        match self {
            DbHandle::Postgres(pool) => pool.close().await,
            DbHandle::MySql(pool) => pool.close().await,
        }
    }

    /// All user tables with row and column counts. Row counts are
    /// best-effort; a table that cannot be counted reports zero.
    pub async fn list_tables(&self) -> Result<Vec<TableInfo>, DbError> {
        let mut tables = Vec::new();

        match self {
            DbHandle::Postgres(pool) => {
                let rows = sqlx::query(
                    r#"
                    SELECT
                        t.table_name::text AS table_name,
                        COALESCE((
                            SELECT COUNT(*)
                            FROM information_schema.columns c
                            WHERE c.table_schema = t.table_schema
                            AND c.table_name = t.table_name
                        ), 0)::bigint AS column_count
                    FROM information_schema.tables t
                    WHERE t.table_schema = 'public'
                    ORDER BY t.table_name
                    "#,
                )
                .fetch_all(pool)
                .await?;

                for row in rows {
                    let name: String = row.try_get("table_name")?;
                    let column_count: i64 = row.try_get("column_count")?;
                    let row_count = self.count_rows(&name).await.unwrap_or(0);
                    tables.push(TableInfo {
                        name,
                        row_count,
                        column_count,
                    });
                }
            }
            DbHandle::MySql(pool) => {
                let rows = sqlx::query(
                    r#"
                    SELECT
                        t.TABLE_NAME AS table_name,
                        COALESCE((
                            SELECT COUNT(*)
                            FROM information_schema.COLUMNS c
                            WHERE c.TABLE_SCHEMA = t.TABLE_SCHEMA
                            AND c.TABLE_NAME = t.TABLE_NAME
                        ), 0) AS column_count
                    FROM information_schema.TABLES t
                    WHERE t.TABLE_SCHEMA = DATABASE()
                    ORDER BY t.TABLE_NAME
                    "#,
                )
                .fetch_all(pool)
                .await?;

                for row in rows {
                    let name: String = row.try_get("table_name")?;
                    let column_count: i64 = row.try_get("column_count")?;
                    let row_count = self.count_rows(&name).await.unwrap_or(0);
                    tables.push(TableInfo {
                        name,
                        row_count,
                        column_count,
                    });
                }
            }
        }

        Ok(tables)
    }

    pub async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
        let mut columns = Vec::new();

        match self {
            DbHandle::Postgres(pool) => {
                let rows = sqlx::query(
                    r#"
                    SELECT column_name::text AS column_name, data_type::text AS data_type
                    FROM information_schema.columns
                    WHERE table_schema = 'public'
                    AND table_name = $1
                    ORDER BY ordinal_position
                    "#,
                )
                .bind(table)
                .fetch_all(pool)
                .await?;

                for row in rows {
                    columns.push(ColumnInfo {
                        name: row.try_get("column_name")?,
                        data_type: row.try_get("data_type")?,
                    });
                }
            }
            DbHandle::MySql(pool) => {
                let rows = sqlx::query(
                    r#"
                    SELECT COLUMN_NAME AS column_name, DATA_TYPE AS data_type
                    FROM information_schema.COLUMNS
                    WHERE TABLE_SCHEMA = DATABASE()
                    AND TABLE_NAME = ?
                    ORDER BY ORDINAL_POSITION
                    "#,
                )
                .bind(table)
                .fetch_all(pool)
                .await?;

                for row in rows {
                    columns.push(ColumnInfo {
                        name: row.try_get("column_name")?,
                        data_type: row.try_get("data_type")?,
                    });
                }
            }
        }

        Ok(columns)
    }

    /// One page of rows, every value cast to text in the query so
    /// arbitrary column types decode uniformly.
    pub async fn fetch_rows(
        &self,
        table: &str,
        columns: &[ColumnInfo],
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Vec<Option<String>>>, DbError> {
        if columns.is_empty() {
            return Ok(vec![]);
        }

        let mut out = Vec::new();
        match self {
            DbHandle::Postgres(pool) => {
                let select: Vec<String> = columns
                    .iter()
                    .map(|c| Ok(format!("{}::text", quote_ident(&c.name, '"')?)))
                    .collect::<Result<_, DbError>>()?;
                let query = format!(
                    "SELECT {} FROM {} LIMIT {} OFFSET {}",
                    select.join(", "),
                    quote_ident(table, '"')?,
                    limit,
                    offset
                );

                for row in sqlx::query(&query).fetch_all(pool).await? {
                    let mut values = Vec::with_capacity(columns.len());
                    for i in 0..columns.len() {
                        values.push(row.try_get::<Option<String>, _>(i)?);
                    }
                    out.push(values);
                }
            }
            DbHandle::MySql(pool) => {
                let select: Vec<String> = columns
                    .iter()
                    .map(|c| Ok(format!("CAST({} AS CHAR)", quote_ident(&c.name, '`')?)))
                    .collect::<Result<_, DbError>>()?;
                let query = format!(
                    "SELECT {} FROM {} LIMIT {} OFFSET {}",
                    select.join(", "),
                    quote_ident(table, '`')?,
                    limit,
                    offset
                );

                for row in sqlx::query(&query).fetch_all(pool).await? {
                    let mut values = Vec::with_capacity(columns.len());
                    for i in 0..columns.len() {
                        values.push(row.try_get::<Option<String>, _>(i)?);
                    }
                    out.push(values);
                }
            }
        }

        Ok(out)
    }

    async fn count_rows(&self, table: &str) -> Result<i64, DbError> {
        match self {
            DbHandle::Postgres(pool) => {
                let query = format!("SELECT COUNT(*) FROM {}", quote_ident(table, '"')?);
                let row = sqlx::query(&query).fetch_one(pool).await?;
                Ok(row.try_get(0)?)
            }
            DbHandle::MySql(pool) => {
                let query = format!("SELECT COUNT(*) FROM {}", quote_ident(table, '`')?);
                let row = sqlx::query(&query).fetch_one(pool).await?;
                Ok(row.try_get(0)?)
            }
        }
    }
}

/// Identifiers are interpolated into statements (placeholders cannot name
/// tables or columns), so anything containing the quote char is rejected.
fn quote_ident(ident: &str, quote: char) -> Result<String, DbError> {
    if ident.is_empty() || ident.contains(quote) {
        return Err(DbError::BadIdentifier(ident.to_string()));
    }
    Ok(format!("{quote}{ident}{quote}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users", '"').unwrap(), "\"users\"");
        assert_eq!(quote_ident("users", '`').unwrap(), "`users`");
        assert!(quote_ident("", '"').is_err());
        assert!(quote_ident("bad\"name", '"').is_err());
    }
}
