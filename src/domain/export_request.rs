use std::{path::PathBuf, sync::LazyLock, time::Duration};

use regex::Regex;

use crate::domain::error::{DumpChunkError, DumpChunkResult};

pub const DEFAULT_PORT: u16 = 3306;

static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_$]+$").expect("identifier pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub server: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    #[cfg_attr(not(feature = "mysql"), allow(dead_code))]
    pub connect_timeout: Duration,
}

/// Everything needed to plan a chunked dump of one table.
///
/// `primary_key` and `max_id` stay `None` until introspection fills them in.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub connection: ConnectionParams,
    pub table: String,
    pub primary_key: Option<String>,
    pub max_id: Option<i128>,
    pub chunk_count: i64,
    pub output_dir: PathBuf,
    pub script_file: Option<PathBuf>,
}

impl ExportRequest {
    /// Checks everything that can be checked without a database.
    pub fn validate(&self) -> DumpChunkResult<()> {
        let required = [
            ("server", &self.connection.server),
            ("database", &self.connection.database),
            ("table", &self.table),
            ("user", &self.connection.user),
            ("password", &self.connection.password),
        ];
        for (field_name, value) in required {
            if value.trim().is_empty() {
                return Err(DumpChunkError::invalid(format!(
                    "{field_name} is required and must not be empty"
                )));
            }
        }

        ensure_plain_identifier(&self.connection.database, "database")?;
        ensure_plain_identifier(&self.table, "table")?;

        if self
            .primary_key
            .as_deref()
            .is_some_and(|primary_key| primary_key.trim().is_empty())
        {
            return Err(DumpChunkError::invalid("primary key must not be empty"));
        }
        if let Some(max_id) = self.max_id.filter(|max_id| *max_id < 0) {
            return Err(DumpChunkError::invalid(format!(
                "max id must be 0 or greater, got {max_id}"
            )));
        }
        if self.chunk_count < 1 {
            return Err(DumpChunkError::invalid(format!(
                "dump file count must be at least 1, got {}",
                self.chunk_count
            )));
        }
        Ok(())
    }

    pub fn into_resolved(self, primary_key: String, max_id: i128) -> ResolvedExport {
        ResolvedExport {
            connection: self.connection,
            table: self.table,
            primary_key: primary_key.trim().to_string(),
            max_id,
            chunk_count: self.chunk_count,
            output_dir: self.output_dir,
            script_file: self.script_file,
        }
    }
}

/// An [`ExportRequest`] whose primary key and max id are known.
#[derive(Debug, Clone)]
pub struct ResolvedExport {
    pub connection: ConnectionParams,
    pub table: String,
    pub primary_key: String,
    pub max_id: i128,
    pub chunk_count: i64,
    pub output_dir: PathBuf,
    pub script_file: Option<PathBuf>,
}

fn ensure_plain_identifier(value: &str, field_name: &str) -> DumpChunkResult<()> {
    if PLAIN_IDENTIFIER.is_match(value) {
        return Ok(());
    }
    Err(DumpChunkError::invalid(format!(
        "{field_name} name `{value}` may only contain letters, digits, `_` and `$`"
    )))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{path::PathBuf, time::Duration};

    use super::*;

    pub(crate) fn sample_request() -> ExportRequest {
        ExportRequest {
            connection: ConnectionParams {
                server: "db1".to_string(),
                port: DEFAULT_PORT,
                database: "shop".to_string(),
                user: "root".to_string(),
                password: "secret".to_string(),
                connect_timeout: Duration::from_secs(10),
            },
            table: "orders".to_string(),
            primary_key: Some("id".to_string()),
            max_id: Some(99),
            chunk_count: 10,
            output_dir: PathBuf::from("/tmp/out"),
            script_file: None,
        }
    }

    #[test]
    fn accepts_complete_request() {
        sample_request()
            .validate()
            .expect("sample request should be valid");
    }

    #[test]
    fn rejects_empty_password() {
        let mut request = sample_request();
        request.connection.password = String::new();

        let error = request.validate().expect_err("empty password should fail");
        assert_eq!(
            error,
            DumpChunkError::invalid("password is required and must not be empty")
        );
    }

    #[test]
    fn rejects_table_name_that_is_not_an_identifier() {
        let mut request = sample_request();
        request.table = "orders; drop table users".to_string();

        let error = request.validate().expect_err("table name should be rejected");
        assert!(error.to_string().contains("table name"));
    }

    #[test]
    fn rejects_bad_counts_before_any_lookup() {
        let mut request = sample_request();
        request.chunk_count = 0;
        assert!(matches!(
            request.validate(),
            Err(DumpChunkError::InvalidArgument(_))
        ));

        let mut request = sample_request();
        request.max_id = Some(-1);
        assert!(matches!(
            request.validate(),
            Err(DumpChunkError::InvalidArgument(_))
        ));
    }
}
