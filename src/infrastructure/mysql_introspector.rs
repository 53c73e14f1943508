use std::{future::Future, time::Duration};

use mysql_async::{Conn, OptsBuilder, Value, prelude::Queryable};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use crate::{
    application::introspection::{Connector, SchemaIntrospector},
    domain::{
        error::{DumpChunkError, DumpChunkResult, MAX_ID_SUBJECT, PRIMARY_KEY_SUBJECT},
        export_request::ConnectionParams,
    },
};

const PRIMARY_KEY_QUERY: &str = "SELECT COLUMN_NAME \
     FROM information_schema.KEY_COLUMN_USAGE \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY' \
     ORDER BY ORDINAL_POSITION";

/// Opens MySQL connections from explicit parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlConnector;

impl Connector for MySqlConnector {
    type Connection = MySqlIntrospector;

    fn connect(&self, params: &ConnectionParams) -> DumpChunkResult<MySqlIntrospector> {
        // mysql_async needs a Tokio context; a private current-thread runtime
        // keeps the rest of the program synchronous.
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                DumpChunkError::connection(format!("unable to start MySQL runtime: {error}"))
            })?;

        let opts = OptsBuilder::default()
            .ip_or_hostname(params.server.clone())
            .tcp_port(params.port)
            .user(Some(params.user.clone()))
            .pass(Some(params.password.clone()))
            .db_name(Some(params.database.clone()));

        debug!(server = %params.server, port = params.port, "opening MySQL connection");
        let conn = runtime
            .block_on(tokio::time::timeout(params.connect_timeout, Conn::new(opts)))
            .map_err(|_| {
                DumpChunkError::connection(format!(
                    "timed out after {}s reaching {}:{}",
                    params.connect_timeout.as_secs(),
                    params.server,
                    params.port
                ))
            })?
            .map_err(|error| DumpChunkError::connection(error.to_string()))?;

        Ok(MySqlIntrospector {
            runtime,
            conn,
            database: params.database.clone(),
            query_timeout: params.connect_timeout,
        })
    }
}

pub struct MySqlIntrospector {
    runtime: Runtime,
    conn: Conn,
    database: String,
    query_timeout: Duration,
}

impl SchemaIntrospector for MySqlIntrospector {
    fn primary_key(&mut self, table: &str) -> DumpChunkResult<String> {
        let params = (self.database.clone(), table.to_string());
        let columns: Vec<String> = block_on_query(
            &self.runtime,
            self.query_timeout,
            PRIMARY_KEY_SUBJECT,
            self.conn.exec(PRIMARY_KEY_QUERY, params),
        )?;
        single_primary_key(table, columns)
    }

    fn max_id(&mut self, table: &str, column: &str) -> DumpChunkResult<i128> {
        let query = format!(
            "SELECT MAX({}) FROM {}",
            quote_column_path(column),
            quote_identifier(table)
        );
        let max_value: Option<Value> = block_on_query(
            &self.runtime,
            self.query_timeout,
            MAX_ID_SUBJECT,
            self.conn.exec_first(query.as_str(), ()),
        )?;
        max_id_from_value(table, column, max_value.unwrap_or(Value::NULL))
    }

    fn close(self) {
        let Self { runtime, conn, .. } = self;
        if let Err(error) = runtime.block_on(conn.disconnect()) {
            warn!(%error, "MySQL connection did not close cleanly");
        }
    }
}

fn block_on_query<T>(
    runtime: &Runtime,
    query_timeout: Duration,
    subject: &'static str,
    query: impl Future<Output = mysql_async::Result<T>>,
) -> DumpChunkResult<T> {
    match runtime.block_on(tokio::time::timeout(query_timeout, query)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(mysql_async::Error::Io(error))) => Err(DumpChunkError::connection(error.to_string())),
        Ok(Err(error)) => Err(DumpChunkError::schema(subject, error.to_string())),
        Err(_) => Err(DumpChunkError::connection(format!(
            "query for {subject} timed out after {}s",
            query_timeout.as_secs()
        ))),
    }
}

fn single_primary_key(table: &str, mut columns: Vec<String>) -> DumpChunkResult<String> {
    match columns.len() {
        0 => Err(DumpChunkError::schema(
            PRIMARY_KEY_SUBJECT,
            format!("table `{table}` has no primary key or does not exist"),
        )),
        1 => Ok(columns.remove(0)),
        _ => Err(DumpChunkError::schema(
            PRIMARY_KEY_SUBJECT,
            format!(
                "table `{table}` has a composite primary key ({})",
                columns.join(", ")
            ),
        )),
    }
}

fn max_id_from_value(table: &str, column: &str, value: Value) -> DumpChunkResult<i128> {
    let max_id = match value {
        Value::NULL => {
            return Err(DumpChunkError::schema(
                MAX_ID_SUBJECT,
                format!("table `{table}` is empty"),
            ));
        }
        Value::Int(number) => i128::from(number),
        Value::UInt(number) => i128::from(number),
        Value::Bytes(bytes) => std::str::from_utf8(&bytes)
            .ok()
            .and_then(|text| text.trim().parse::<i128>().ok())
            .ok_or_else(|| not_an_integer(column))?,
        _ => return Err(not_an_integer(column)),
    };

    if max_id < 0 {
        return Err(DumpChunkError::schema(
            MAX_ID_SUBJECT,
            format!("largest `{column}` value is negative ({max_id})"),
        ));
    }
    Ok(max_id)
}

fn not_an_integer(column: &str) -> DumpChunkError {
    DumpChunkError::schema(
        MAX_ID_SUBJECT,
        format!("column `{column}` does not hold integer ids"),
    )
}

fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn quote_column_path(column: &str) -> String {
    column
        .split('.')
        .map(|part| quote_identifier(part.trim().trim_matches('`')))
        .collect::<Vec<_>>()
        .join(".")
}
