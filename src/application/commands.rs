use std::path::PathBuf;

use crate::{
    domain::export_request::ResolvedExport, infrastructure::mysqldump_template::DumpCommand,
};

/// Fully rendered dump commands for one table, ready to be written out.
#[derive(Debug)]
pub struct DumpPlan {
    pub export: ResolvedExport,
    pub commands: Vec<DumpCommand>,
    pub skipped_empty_chunks: usize,
}

#[derive(Debug)]
pub struct GenerateDumpCommandsResult {
    pub script_path: Option<PathBuf>,
    pub command_count: usize,
}
