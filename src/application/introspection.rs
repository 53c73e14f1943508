use tracing::{debug, info};

use crate::domain::{
    error::{DumpChunkError, DumpChunkResult},
    export_request::{ConnectionParams, ExportRequest, ResolvedExport},
};

/// Read-only schema lookups against one open connection.
pub trait SchemaIntrospector {
    /// Name of the table's single primary key column.
    fn primary_key(&mut self, table: &str) -> DumpChunkResult<String>;

    /// Largest value currently stored in `column`.
    fn max_id(&mut self, table: &str, column: &str) -> DumpChunkResult<i128>;

    fn close(self);
}

/// Opens introspection connections on demand.
pub trait Connector {
    type Connection: SchemaIntrospector;

    fn connect(&self, params: &ConnectionParams) -> DumpChunkResult<Self::Connection>;
}

/// Connector for builds without a database driver.
#[cfg_attr(feature = "mysql", allow(dead_code))]
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDriverConnector;

#[cfg_attr(feature = "mysql", allow(dead_code))]
#[derive(Debug)]
pub enum NoConnection {}

impl SchemaIntrospector for NoConnection {
    fn primary_key(&mut self, _table: &str) -> DumpChunkResult<String> {
        match *self {}
    }

    fn max_id(&mut self, _table: &str, _column: &str) -> DumpChunkResult<i128> {
        match *self {}
    }

    fn close(self) {
        match self {}
    }
}

impl Connector for NoDriverConnector {
    type Connection = NoConnection;

    fn connect(&self, _params: &ConnectionParams) -> DumpChunkResult<NoConnection> {
        Err(DumpChunkError::DriverUnavailable)
    }
}

/// Fills in whichever of primary key and max id the caller left out.
///
/// The connector is only touched when something is missing, so a request
/// carrying both values never opens a connection.
pub fn resolve_export<C: Connector>(
    request: ExportRequest,
    connector: &C,
) -> DumpChunkResult<ResolvedExport> {
    request.validate()?;

    if let (Some(primary_key), Some(max_id)) = (request.primary_key.clone(), request.max_id) {
        debug!(%primary_key, max_id, "primary key and max id given, skipping introspection");
        return Ok(request.into_resolved(primary_key, max_id));
    }

    info!(
        server = %request.connection.server,
        database = %request.connection.database,
        table = %request.table,
        "querying database for missing table metadata"
    );
    let mut connection = connector.connect(&request.connection)?;
    let lookup = lookup_missing(&mut connection, &request);
    connection.close();

    let (primary_key, max_id) = lookup?;
    Ok(request.into_resolved(primary_key, max_id))
}

fn lookup_missing<I: SchemaIntrospector>(
    connection: &mut I,
    request: &ExportRequest,
) -> DumpChunkResult<(String, i128)> {
    let primary_key = match &request.primary_key {
        Some(primary_key) => primary_key.clone(),
        None => {
            let primary_key = connection.primary_key(&request.table)?;
            info!(%primary_key, table = %request.table, "found table primary key");
            primary_key
        }
    };

    let max_id = match request.max_id {
        Some(max_id) => max_id,
        None => {
            let max_id = connection.max_id(&request.table, &primary_key)?;
            info!(max_id, table = %request.table, "found max primary key value");
            max_id
        }
    };

    Ok((primary_key, max_id))
}
