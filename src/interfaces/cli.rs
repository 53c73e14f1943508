use std::{
    env,
    path::{self, Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use console::style;
use dialoguer::{Confirm, Input, Password, theme::ColorfulTheme};

use crate::{
    domain::export_request::{ConnectionParams, DEFAULT_PORT, ExportRequest},
    logging::Verbosity,
};

const DEFAULT_DUMPFILE_COUNT: i64 = 10;
const DEFAULT_OUTPUT_DIR: &str = "./";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Parser)]
#[command(
    name = "mysqldump-chunks",
    version,
    about = "Create mysqldump commands that dump a large table in chunks"
)]
struct CliArgs {
    /// MySQL server hostname or IP address
    server: String,
    /// MySQL database name
    database: String,
    /// Table to be dumped
    table: String,
    /// MySQL user
    user: String,
    /// MySQL password
    password: String,
    #[arg(
        long,
        short = 'c',
        default_value_t = DEFAULT_DUMPFILE_COUNT,
        allow_negative_numbers = true,
        help = "Number of .sql dump files to create"
    )]
    dumpfile_count: i64,
    #[arg(long, short = 'i', help = "Table primary key column, introspected when omitted")]
    db_primary_key: Option<String>,
    #[arg(long, short = 'o', default_value = DEFAULT_OUTPUT_DIR, help = "Directory for the .sql files")]
    output_dir: PathBuf,
    #[arg(
        long,
        short = 'm',
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "Max primary key value, 0 means introspect"
    )]
    db_max_id: i128,
    #[arg(long, short = 'f', help = "Save the commands as an executable bash script")]
    script_file: Option<PathBuf>,
    #[arg(long, short = 'P', default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS, help = "Seconds to wait for MySQL")]
    connect_timeout: u64,
    #[arg(long, short = 'v')]
    verbose: bool,
    #[arg(long)]
    debug: bool,
}

#[derive(Debug)]
pub struct CliInvocation {
    pub request: ExportRequest,
    pub verbosity: Verbosity,
}

pub fn collect_invocation() -> Result<CliInvocation> {
    if env::args_os().len() == 1 && console::user_attended_stderr() {
        return collect_interactive_invocation();
    }
    collect_invocation_from_args(CliArgs::parse())
}

pub fn usage() -> String {
    CliArgs::command().render_usage().to_string()
}

fn collect_invocation_from_args(args: CliArgs) -> Result<CliInvocation> {
    let connection = ConnectionParams {
        server: args.server,
        port: args.port,
        database: args.database,
        user: args.user,
        password: args.password,
        connect_timeout: Duration::from_secs(args.connect_timeout),
    };

    let request = ExportRequest {
        connection,
        table: args.table,
        primary_key: args.db_primary_key,
        max_id: introspect_when_zero(args.db_max_id),
        chunk_count: args.dumpfile_count,
        output_dir: absolute(&args.output_dir)?,
        script_file: args.script_file.as_deref().map(absolute).transpose()?,
    };

    Ok(CliInvocation {
        request,
        verbosity: Verbosity::from_flags(args.verbose, args.debug),
    })
}

fn collect_interactive_invocation() -> Result<CliInvocation> {
    let theme = ColorfulTheme::default();

    eprintln!();
    eprintln!(
        "{}",
        style(" MYSQLDUMP CHUNKS ")
            .black()
            .on_cyan()
            .bold()
            .underlined()
    );
    eprintln!("{}", style("Dump one large table as many smaller files").dim());
    eprintln!();

    let server = prompt_required(&theme, "MySQL server")?;
    let port: u16 = Input::with_theme(&theme)
        .with_prompt("Port")
        .default(DEFAULT_PORT)
        .interact_text()?;
    let database = prompt_required(&theme, "Database")?;
    let table = prompt_required(&theme, "Table")?;
    let user = prompt_required(&theme, "User")?;
    let password = Password::with_theme(&theme)
        .with_prompt("Password")
        .interact()?;

    let chunk_count: i64 = Input::with_theme(&theme)
        .with_prompt("Number of dump files")
        .default(DEFAULT_DUMPFILE_COUNT)
        .validate_with(|value: &i64| {
            if *value < 1 {
                Err("Number of dump files must be at least 1")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let primary_key: String = Input::with_theme(&theme)
        .with_prompt("Primary key column (empty to introspect)")
        .allow_empty(true)
        .interact_text()?;

    let max_id: i128 = Input::with_theme(&theme)
        .with_prompt("Max primary key value (0 to introspect)")
        .default(0)
        .validate_with(|value: &i128| {
            if *value < 0 {
                Err("Max id must not be negative")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let output_dir: String = Input::with_theme(&theme)
        .with_prompt("Output directory")
        .default(DEFAULT_OUTPUT_DIR.to_string())
        .interact_text()?;

    let script_file: String = Input::with_theme(&theme)
        .with_prompt("Script file (empty to print commands)")
        .allow_empty(true)
        .interact_text()?;

    let verbose = Confirm::with_theme(&theme)
        .with_prompt("Verbose output?")
        .default(false)
        .interact()?;

    let request = ExportRequest {
        connection: ConnectionParams {
            server,
            port,
            database,
            user,
            password,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        },
        table,
        primary_key: non_empty(primary_key),
        max_id: introspect_when_zero(max_id),
        chunk_count,
        output_dir: absolute(Path::new(output_dir.trim()))?,
        script_file: non_empty(script_file)
            .map(|path| absolute(Path::new(&path)))
            .transpose()?,
    };

    Ok(CliInvocation {
        request,
        verbosity: Verbosity::from_flags(verbose, false),
    })
}

fn prompt_required(theme: &ColorfulTheme, prompt: &str) -> Result<String> {
    let value: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .validate_with(|value: &String| {
            if value.trim().is_empty() {
                Err("Value must not be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(value.trim().to_string())
}

fn introspect_when_zero(max_id: i128) -> Option<i128> {
    (max_id != 0).then_some(max_id)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn absolute(raw: &Path) -> Result<PathBuf> {
    path::absolute(raw).with_context(|| format!("Unable to resolve path: {}", raw.display()))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::{CliArgs, collect_invocation_from_args, usage};
    use crate::logging::Verbosity;

    const POSITIONALS: [&str; 6] = ["mysqldump-chunks", "db1", "shop", "orders", "root", "secret"];

    fn parse(extra: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(POSITIONALS.iter().chain(extra).copied()).expect("cli args should parse")
    }

    #[test]
    fn defaults_leave_values_to_introspection() {
        let invocation =
            collect_invocation_from_args(parse(&[])).expect("invocation should be created");
        let request = invocation.request;

        assert_eq!(request.connection.server, "db1");
        assert_eq!(request.connection.database, "shop");
        assert_eq!(request.table, "orders");
        assert_eq!(request.connection.user, "root");
        assert_eq!(request.connection.password, "secret");
        assert_eq!(request.connection.port, 3306);
        assert_eq!(request.chunk_count, 10);
        assert_eq!(request.primary_key, None);
        assert_eq!(request.max_id, None);
        assert_eq!(request.script_file, None);
        assert!(request.output_dir.is_absolute());
        assert_eq!(invocation.verbosity, Verbosity::Quiet);
    }

    #[test]
    fn parses_explicit_key_and_max_id() {
        let invocation = collect_invocation_from_args(parse(&[
            "--dumpfile-count",
            "4",
            "--db-primary-key",
            "order_id",
            "--db-max-id",
            "103",
            "--output-dir",
            "/var/dumps",
            "-f",
            "/var/dumps/run.sh",
            "-v",
        ]))
        .expect("invocation should be created");
        let request = invocation.request;

        assert_eq!(request.chunk_count, 4);
        assert_eq!(request.primary_key.as_deref(), Some("order_id"));
        assert_eq!(request.max_id, Some(103));
        assert_eq!(request.output_dir, PathBuf::from("/var/dumps"));
        assert_eq!(request.script_file, Some(PathBuf::from("/var/dumps/run.sh")));
        assert_eq!(invocation.verbosity, Verbosity::Verbose);
    }

    #[test]
    fn negative_values_reach_validation() {
        let invocation = collect_invocation_from_args(parse(&["-c", "-2", "-m", "-1"]))
            .expect("invocation should be created");

        assert_eq!(invocation.request.chunk_count, -2);
        assert_eq!(invocation.request.max_id, Some(-1));
        assert!(invocation.request.validate().is_err());
    }

    #[test]
    fn rejects_missing_positional_arguments() {
        let error = CliArgs::try_parse_from(["mysqldump-chunks", "db1", "shop"])
            .expect_err("missing positionals should be rejected");
        assert_eq!(
            error.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn usage_lists_positional_arguments() {
        let usage = usage();
        assert!(usage.contains("<SERVER> <DATABASE> <TABLE> <USER> <PASSWORD>"));
    }
}
