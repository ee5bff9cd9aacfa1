//! `SQLite` schema definitions for the verification results store.

/// SQL statement to create the run verifications table.
///
/// One row per verified run. `init_time` is an RFC 3339 string, empty when
/// the run has no initialization time.
pub const CREATE_RUNS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS run_verifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    storm TEXT NOT NULL,
    year INTEGER NOT NULL,
    model TEXT NOT NULL,
    tech TEXT NOT NULL,
    is_member INTEGER NOT NULL DEFAULT 0,
    init_time TEXT NOT NULL DEFAULT '',
    fixes INTEGER NOT NULL,
    dropped INTEGER NOT NULL,
    mean_track_error REAL NOT NULL,
    mean_intensity_error REAL NOT NULL,
    mean_wind_error REAL NOT NULL,
    along_track_bias REAL NOT NULL,
    cross_track_bias REAL NOT NULL,
    recorded_at TEXT NOT NULL,
    UNIQUE (storm, year, model, tech, init_time)
)
";

/// SQL statement to create an index on storm and year for history queries.
pub const CREATE_STORM_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_runs_storm ON run_verifications(storm, year)
";

/// SQL statement to create an index on model for per-model averages.
pub const CREATE_MODEL_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_runs_model ON run_verifications(model)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_RUNS_TABLE,
    CREATE_STORM_INDEX,
    CREATE_MODEL_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_runs_table_is_unique_per_run() {
        assert!(CREATE_RUNS_TABLE.contains("UNIQUE (storm, year, model, tech, init_time)"));
        assert!(CREATE_RUNS_TABLE.contains("fixes INTEGER NOT NULL"));
    }
}
