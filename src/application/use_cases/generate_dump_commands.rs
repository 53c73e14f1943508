use std::io;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    application::{
        commands::{DumpPlan, GenerateDumpCommandsResult},
        introspection::{Connector, resolve_export},
    },
    domain::{export_request::ExportRequest, id_partition::partition},
    infrastructure::{
        dump_script::{save_script, write_command_lines},
        mysqldump_template::MysqldumpTemplate,
    },
};

const SMALL_TABLE_IDS: i128 = 10_000;

#[derive(Debug, Default)]
pub struct GenerateDumpCommandsUseCase<C> {
    connector: C,
}

impl<C: Connector> GenerateDumpCommandsUseCase<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Resolves the request and renders every command without writing any.
    pub fn plan(&self, request: ExportRequest) -> Result<DumpPlan> {
        let export = resolve_export(request, &self.connector)?;
        let ranges = partition(export.max_id, export.chunk_count)?;
        let template = MysqldumpTemplate::new(&export)?;

        let total_ids = export.max_id + 1;
        if total_ids < SMALL_TABLE_IDS {
            warn!(
                table = %export.table,
                ids = %total_ids,
                "table id space is small, chunked dumps may not be useful"
            );
        }

        let mut commands = Vec::new();
        let mut skipped_empty_chunks = 0usize;
        for range in ranges {
            if range.is_empty() {
                skipped_empty_chunks += 1;
                continue;
            }
            let command = template.render_chunk(commands.len() + 1, range);
            debug!(
                file_index = command.file_index,
                lower = %range.lower,
                upper = %range.upper,
                "rendered chunk"
            );
            commands.push(command);
        }

        info!(
            table = %export.table,
            primary_key = %export.primary_key,
            max_id = %export.max_id,
            chunks = commands.len(),
            chunk_size = %commands.first().map(|command| command.range.len()).unwrap_or_default(),
            "planned chunked dump"
        );

        Ok(DumpPlan {
            export,
            commands,
            skipped_empty_chunks,
        })
    }

    pub fn execute(&self, request: ExportRequest) -> Result<GenerateDumpCommandsResult> {
        let plan = self.plan(request)?;
        if plan.skipped_empty_chunks > 0 {
            warn!(
                requested = plan.export.chunk_count,
                emitted = plan.commands.len(),
                "more dump files requested than ids available, skipped empty chunks"
            );
        }

        match &plan.export.script_file {
            Some(script_path) => save_script(script_path, &plan.commands)?,
            None => write_command_lines(io::stdout().lock(), &plan.commands)
                .context("Unable to write commands to stdout")?,
        }

        Ok(GenerateDumpCommandsResult {
            script_path: plan.export.script_file,
            command_count: plan.commands.len(),
        })
    }
}
