use clap::{Parser, Subcommand, ValueEnum};
use dblayer::{Connection, ConnectionConfig, LockState};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser as SqlParser;
use std::path::{Path, PathBuf};
use std::process;

/// dblayer CLI - run statements and manage tables through a dblayer connection
#[derive(Parser)]
#[command(name = "dblayer", version, about)]
struct Cli {
    /// Connection config file (default: DBLAYER_* environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run one or more SQL statements
    Sql {
        /// Statement text
        statement: String,
    },

    /// List tables in the database
    Tables,

    /// Show the columns of a table
    Columns {
        /// Table name, without prefix
        table: String,
    },

    /// Create the tables declared in a tables.yaml file
    Create {
        /// Path to the table file
        file: PathBuf,
        /// Print the DDL without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Check whether this connection may write-lock a table
    LockCheck {
        /// Table name, without prefix
        table: String,
    },

    /// Show driver and server version
    Version,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = run(&cli).and_then(|value| print_output(&value, &cli.format));
    if let Err(e) = result {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<ConnectionConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            log::debug!("Loading connection config from {}", path.display());
            ConnectionConfig::from_file(path)?
        }
        None => {
            log::debug!("No --config given, reading DBLAYER_* environment");
            ConnectionConfig::from_env()?.ok_or(
                "No connection configured: pass --config or set DBLAYER_DRIVER",
            )?
        }
    };
    log::debug!(
        "Resolved config: driver={} database={} prefix={:?}",
        config.driver,
        config.database,
        config.prefix
    );
    Ok(config)
}

fn run(cli: &Cli) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;
    let con = Connection::connect(&config)?;
    log::debug!("Connected with {} driver, server {}", con.driver(), con.version());

    let value = match &cli.command {
        Command::Sql { statement } => run_sql(&con, statement)?,

        Command::Tables => serde_json::json!(con.schema().tables()?),

        Command::Columns { table } => {
            let columns = con.schema().columns(&con.table(table))?;
            serde_json::to_value(columns)?
        }

        Command::Create { file, dry_run } => {
            let tables = dblayer::schema::parse_tables(file)?;
            let schema = con.schema();
            let statements = if *dry_run {
                schema.file_statements(&tables)?
            } else {
                schema.create_from_file(&tables)?
            };
            serde_json::json!({ "dry_run": dry_run, "statements": statements })
        }

        Command::LockCheck { table } => {
            let table = con.table(table);
            let privilege = con.supports_locking(&table)?;
            let state = con.write_lock(&table)?;
            if state == LockState::Held {
                con.unlock()?;
            }
            serde_json::json!({
                "table": table,
                "privilege": privilege,
                "weak_locks": con.weak_locks(),
                "lock": match state {
                    LockState::Held => "held",
                    LockState::Skipped => "skipped",
                },
            })
        }

        Command::Version => serde_json::json!({
            "driver": con.driver().name(),
            "server_version": con.version(),
            "dblayer": env!("CARGO_PKG_VERSION"),
        }),
    };

    Ok(value)
}

fn dialect_for(con: &Connection) -> Box<dyn Dialect> {
    match con.driver() {
        dblayer::Driver::Sqlite => Box::new(SQLiteDialect {}),
        dblayer::Driver::Pgsql => Box::new(PostgreSqlDialect {}),
        dblayer::Driver::Mysql | dblayer::Driver::MysqlMb4 => Box::new(MySqlDialect {}),
    }
}

/// Statements that answer with rows rather than an affected count.
fn returns_rows(statement: &sqlparser::ast::Statement) -> bool {
    use sqlparser::ast::Statement;
    matches!(
        statement,
        Statement::Query(_)
            | Statement::ShowTables { .. }
            | Statement::ShowColumns { .. }
            | Statement::Pragma { .. }
            | Statement::Explain { .. }
    )
}

fn run_sql(con: &Connection, sql: &str) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let dialect = dialect_for(con);
    let statements = SqlParser::parse_sql(dialect.as_ref(), sql)?;
    if statements.is_empty() {
        return Err("No statement given".into());
    }

    let mut results = Vec::with_capacity(statements.len());
    for statement in &statements {
        let text = statement.to_string();
        log::debug!("Running: {text}");
        if returns_rows(statement) {
            let rows = con.select(&text)?.to_static();
            results.push(rows.to_json());
        } else {
            let affected = con.execute(&text)?;
            results.push(serde_json::json!({ "affected": affected }));
        }
    }

    Ok(match results.len() {
        1 => results.remove(0),
        _ => serde_json::Value::Array(results),
    })
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}
