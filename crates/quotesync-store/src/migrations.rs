use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_stocks",
        sql: r#"
CREATE TABLE IF NOT EXISTS stocks (
    symbol TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    price TEXT NOT NULL,
    company_logo_url TEXT,
    percentage_change TEXT,
    absolute_change TEXT,
    last_dividend TEXT,
    sector TEXT,
    industry TEXT,
    is_favorite BOOLEAN NOT NULL DEFAULT FALSE,
    has_profile_data BOOLEAN NOT NULL DEFAULT FALSE,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS sync_log (
    request_id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    origin TEXT NOT NULL,
    timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_stocks_favorite ON stocks(is_favorite);
CREATE INDEX IF NOT EXISTS idx_sync_log_symbol_ts ON sync_log(symbol, timestamp);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<usize, ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    let mut applied = 0;
    for migration in MIGRATIONS {
        let seen: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;
        if seen > 0 {
            continue;
        }

        connection.execute_batch(migration.sql)?;
        connection.execute(
            "INSERT INTO schema_migrations (version) VALUES (?)",
            [migration.version],
        )?;
        tracing::debug!(version = migration.version, "applied store migration");
        applied += 1;
    }

    Ok(applied)
}
