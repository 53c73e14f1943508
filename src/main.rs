mod application;
mod domain;
mod infrastructure;
mod interfaces;
mod logging;

use std::process::ExitCode;

use anyhow::Result;
use console::style;

use crate::application::use_cases::generate_dump_commands::GenerateDumpCommandsUseCase;
use crate::domain::error::DumpChunkError;
use crate::interfaces::cli::{collect_invocation, usage};
use crate::logging::init_logging;

#[cfg(feature = "mysql")]
fn connector() -> infrastructure::mysql_introspector::MySqlConnector {
    infrastructure::mysql_introspector::MySqlConnector
}

#[cfg(not(feature = "mysql"))]
fn connector() -> application::introspection::NoDriverConnector {
    application::introspection::NoDriverConnector
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_error(&error);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let invocation = collect_invocation()?;
    init_logging(invocation.verbosity);

    let use_case = GenerateDumpCommandsUseCase::new(connector());
    let result = use_case.execute(invocation.request)?;

    if let Some(script_path) = result.script_path {
        eprintln!(
            "{} {} ({} dump commands)",
            style("mysqldump script ready:").green(),
            style(script_path.display()).bold(),
            result.command_count,
        );
    }
    Ok(())
}

fn report_error(error: &anyhow::Error) {
    eprintln!("{} {error:#}", style("error:").red().bold());

    match error.downcast_ref::<DumpChunkError>() {
        Some(DumpChunkError::InvalidArgument(_)) => eprintln!("\n{}", usage()),
        Some(domain_error) => {
            if let Some(remedy) = domain_error.remedy() {
                eprintln!("{} {remedy}", style("hint:").cyan());
            }
        }
        None => {}
    }
}
