use std::{path::PathBuf, sync::LazyLock};

use regex::Regex;
use sqlparser::{
    ast::{Expr, Ident, SelectItem, SetExpr, Statement, Value},
    dialect::MySqlDialect,
    parser::Parser,
};

use crate::domain::{
    error::{DumpChunkError, DumpChunkResult},
    export_request::{DEFAULT_PORT, ResolvedExport},
    id_partition::IdRange,
};

const MYSQLDUMP_BASE: &str = "mysqldump --opt --order-by-primary --compress";
const DATA_ONLY_FLAGS: &str = "--skip-add-drop-table --no-create-info";

static SHELL_SAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_@%+=:,./-]+$").expect("shell pattern is valid"));

/// One rendered `mysqldump` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCommand {
    pub file_index: usize,
    pub range: IdRange,
    pub output_file: PathBuf,
    pub command_line: String,
}

#[derive(Debug, Clone)]
pub struct MysqldumpTemplate {
    connection_args: String,
    primary_key_expr: Expr,
    output_dir: PathBuf,
    database: String,
    table: String,
}

impl MysqldumpTemplate {
    pub fn new(export: &ResolvedExport) -> DumpChunkResult<Self> {
        let primary_key_expr = build_primary_key_expr(&export.primary_key, &export.table)?;

        let connection = &export.connection;
        let mut connection_args = format!("-h {}", shell_quote(&connection.server));
        if connection.port != DEFAULT_PORT {
            connection_args.push_str(&format!(" -P {}", connection.port));
        }
        connection_args.push_str(&format!(
            " -u {} -p{}",
            shell_quote(&connection.user),
            single_quote(&connection.password)
        ));

        Ok(Self {
            connection_args,
            primary_key_expr,
            output_dir: export.output_dir.clone(),
            database: connection.database.clone(),
            table: export.table.clone(),
        })
    }

    pub fn output_file(&self, file_index: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}.{file_index:03}.sql", self.table))
    }

    pub fn range_predicate(&self, range: IdRange) -> String {
        Expr::Between {
            expr: Box::new(self.primary_key_expr.clone()),
            negated: false,
            low: Box::new(Expr::value(Value::Number(range.lower.to_string(), false))),
            high: Box::new(Expr::value(Value::Number(range.upper.to_string(), false))),
        }
        .to_string()
    }

    /// Renders the command for the 1-based `file_index`.
    ///
    /// Only the first file carries `DROP TABLE`/`CREATE TABLE`; later files
    /// append rows to it.
    pub fn render_chunk(&self, file_index: usize, range: IdRange) -> DumpCommand {
        let output_file = self.output_file(file_index);
        let mut command_line = format!("{MYSQLDUMP_BASE} {}", self.connection_args);
        if file_index > 1 {
            command_line.push(' ');
            command_line.push_str(DATA_ONLY_FLAGS);
        }
        command_line.push_str(&format!(
            " --where={} -r {} {} {}",
            single_quote(&self.range_predicate(range)),
            shell_quote(&output_file.to_string_lossy()),
            shell_quote(&self.database),
            shell_quote(&self.table),
        ));

        DumpCommand {
            file_index,
            range,
            output_file,
            command_line,
        }
    }
}

fn build_primary_key_expr(primary_key: &str, table: &str) -> DumpChunkResult<Expr> {
    let trimmed_primary_key = primary_key.trim();
    if trimmed_primary_key.is_empty() {
        return Err(DumpChunkError::invalid("primary key must not be empty"));
    }

    match parse_column_path(trimmed_primary_key)? {
        Expr::Identifier(column) => Ok(Expr::CompoundIdentifier(vec![Ident::new(table), column])),
        // mysqldump queries the bare table, so the only usable qualifier is its name.
        Expr::CompoundIdentifier(parts) if parts.len() == 2 && parts[0].value == table => {
            Ok(Expr::CompoundIdentifier(parts))
        }
        Expr::CompoundIdentifier(_) => Err(DumpChunkError::invalid(format!(
            "primary key `{trimmed_primary_key}` must be a column of `{table}`, \
             either `column` or `{table}.column`"
        ))),
        _ => Err(invalid_primary_key(trimmed_primary_key)),
    }
}

// Parsing "SELECT <pk> FROM <placeholder>" lets the SQL parser reject anything that is
// not a plain column path before it lands inside a shell command.
fn parse_column_path(raw: &str) -> DumpChunkResult<Expr> {
    let check_sql = format!("SELECT {raw} FROM __pk_check");
    let mut statements = Parser::parse_sql(&MySqlDialect {}, &check_sql)
        .map_err(|_| invalid_primary_key(raw))?;
    if statements.len() != 1 {
        return Err(invalid_primary_key(raw));
    }

    let Statement::Query(query) = statements.remove(0) else {
        return Err(invalid_primary_key(raw));
    };
    let SetExpr::Select(select) = *query.body else {
        return Err(invalid_primary_key(raw));
    };
    match select.projection.as_slice() {
        [SelectItem::UnnamedExpr(expr)] => Ok(expr.clone()),
        _ => Err(invalid_primary_key(raw)),
    }
}

fn invalid_primary_key(raw: &str) -> DumpChunkError {
    DumpChunkError::invalid(format!(
        "primary key must be a column name like `id` or `orders.id`, got `{raw}`"
    ))
}

pub fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub fn shell_quote(value: &str) -> String {
    if SHELL_SAFE.is_match(value) {
        value.to_string()
    } else {
        single_quote(value)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::domain::export_request::tests::sample_request;

    fn template_for(primary_key: &str) -> MysqldumpTemplate {
        let export = sample_request().into_resolved(primary_key.to_string(), 99);
        MysqldumpTemplate::new(&export).expect("template should be built")
    }

    #[test]
    fn first_chunk_keeps_table_definition() {
        let command = template_for("id").render_chunk(1, IdRange { lower: 0, upper: 9 });

        assert_eq!(
            command.command_line,
            "mysqldump --opt --order-by-primary --compress -h db1 -u root -p'secret' \
             --where='orders.id BETWEEN 0 AND 9' -r /tmp/out/orders.001.sql shop orders"
        );
        assert_eq!(command.output_file, PathBuf::from("/tmp/out/orders.001.sql"));
    }

    #[test]
    fn later_chunks_dump_rows_only() {
        let command = template_for("id").render_chunk(2, IdRange { lower: 10, upper: 19 });

        assert!(
            command
                .command_line
                .contains("-p'secret' --skip-add-drop-table --no-create-info --where=")
        );
        assert!(command.command_line.contains("orders.id BETWEEN 10 AND 19"));
        assert!(command.command_line.contains("orders.002.sql"));
    }

    #[test]
    fn accepts_primary_key_qualified_with_the_table() {
        let template = template_for("orders.order_id");
        assert_eq!(
            template.range_predicate(IdRange {
                lower: 100,
                upper: 199
            }),
            "orders.order_id BETWEEN 100 AND 199"
        );
    }

    #[test]
    fn rejects_primary_key_qualified_with_another_name() {
        for primary_key in ["o.order_id", "shop.orders.order_id"] {
            let export = sample_request().into_resolved(primary_key.to_string(), 99);
            let error = MysqldumpTemplate::new(&export).expect_err("qualifier should be rejected");
            assert!(matches!(error, DumpChunkError::InvalidArgument(_)));
            assert!(error.to_string().contains("must be a column of `orders`"));
        }
    }

    #[test]
    fn quotes_table_and_database_names_with_dollar_sign() {
        let mut export = sample_request().into_resolved("id".to_string(), 99);
        export.table = "acct$log".to_string();
        export.connection.database = "shop$2024".to_string();

        let command = MysqldumpTemplate::new(&export)
            .expect("template should be built")
            .render_chunk(1, IdRange { lower: 0, upper: 9 });

        assert!(
            command
                .command_line
                .ends_with("-r '/tmp/out/acct$log.001.sql' 'shop$2024' 'acct$log'")
        );
        assert!(command.command_line.contains("--where='acct$log.id BETWEEN 0 AND 9'"));
    }

    #[test]
    fn rejects_primary_key_that_is_not_a_column() {
        let export = sample_request().into_resolved("id; rm -rf /".to_string(), 99);
        let error = MysqldumpTemplate::new(&export).expect_err("pk should be rejected");
        assert!(error.to_string().contains("primary key must be a column name"));

        let export = sample_request().into_resolved("max(id)".to_string(), 99);
        assert!(MysqldumpTemplate::new(&export).is_err());
    }

    #[test]
    fn quotes_password_and_non_default_port() {
        let mut export = sample_request().into_resolved("id".to_string(), 99);
        export.connection.password = "it's".to_string();
        export.connection.port = 3307;

        let command = MysqldumpTemplate::new(&export)
            .expect("template should be built")
            .render_chunk(1, IdRange { lower: 0, upper: 1 });

        assert!(command.command_line.contains(r"-h db1 -P 3307 -u root -p'it'\''s'"));
    }

    #[test]
    fn quotes_output_paths_with_spaces() {
        let mut export = sample_request().into_resolved("id".to_string(), 99);
        export.output_dir = PathBuf::from("/tmp/my dumps");

        let command = MysqldumpTemplate::new(&export)
            .expect("template should be built")
            .render_chunk(12, IdRange { lower: 0, upper: 1 });

        assert!(command.command_line.contains("-r '/tmp/my dumps/orders.012.sql'"));
    }
}
