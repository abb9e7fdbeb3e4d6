use dbadapter::config::{default_config_path, load_config};
use dbadapter::{Connection, DriverConfig, DriverError, Result, Value};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

const USAGE: &str = "usage: dbadapter [--config <file>] [<dsn>] [SQL ...]";

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    dsn: Option<String>,
    statements: Vec<String>,
}

fn parse_args(args: Vec<String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().ok_or_else(|| {
                    DriverError::Configuration(format!("--config needs a file\n{}", USAGE))
                })?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--help" | "-h" => {
                return Err(DriverError::Configuration(USAGE.to_string()));
            }
            _ if parsed.config.is_none() && parsed.dsn.is_none() && parsed.statements.is_empty() => {
                parsed.dsn = Some(arg);
            }
            _ => parsed.statements.push(arg),
        }
    }
    Ok(parsed)
}

fn resolve_config(args: &Args) -> Result<DriverConfig> {
    if let Some(path) = &args.config {
        return load_config(path);
    }
    if let Some(dsn) = &args.dsn {
        return Ok(DriverConfig::from_dsn(dsn.clone()));
    }
    match default_config_path() {
        Some(path) if path.exists() => load_config(path),
        _ => Err(DriverError::Configuration(format!(
            "no DSN given and no default config found\n{}",
            USAGE
        ))),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
        other => other.to_string(),
    }
}

fn run_statement(conn: &mut Connection, sql: &str, out: &mut impl Write) -> Result<()> {
    match conn.query(sql)? {
        Some(result) => {
            writeln!(out, "{}", result.columns()?.join("\t"))?;
            for row in result {
                let row = row?;
                let line: Vec<String> = row.iter().map(|(_, value)| render(value)).collect();
                writeln!(out, "{}", line.join("\t"))?;
            }
        }
        None => writeln!(out, "OK")?,
    }
    Ok(())
}

fn run(args: Vec<String>) -> Result<()> {
    let args = parse_args(args)?;
    let config = resolve_config(&args)?;
    let mut conn = Connection::open(config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.statements.is_empty() {
        info!("reading statements from stdin");
        for line in io::stdin().lock().lines() {
            let line = line?;
            let sql = line.trim();
            if sql.is_empty() || sql.starts_with("--") {
                continue;
            }
            run_statement(&mut conn, sql, &mut out)?;
        }
    } else {
        for sql in &args.statements {
            run_statement(&mut conn, sql, &mut out)?;
        }
    }

    conn.disconnect();
    Ok(())
}

fn main() {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    if let Err(e) = run(std::env::args().skip(1).collect()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
