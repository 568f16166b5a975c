use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;

use xapidb::error::{Result, XapiError};
use xapidb::persist::{Persistor, dump};
use xapidb::render::write_json;
use xapidb::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "xapidb", version, about = "Convert an XML dump of the XAPI database to JSON or SQL")]
struct Cli {
    /// Settings file (defaults to xapidb.toml in the working directory, if present)
    #[arg(long, global = true, env = "XAPIDB_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dump the database to a JSON file
    Json(JsonArgs),
    /// Dump the database to an SQLite file, or as SQL text to stdout
    Sql(SqlArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Path to the XML dump of the XAPI database
    #[arg(value_name = "XAPIDB")]
    xapi_db: PathBuf,
    /// Include the version metadata of the database in the '_version' key
    #[arg(short = 'v', long = "print-db-version")]
    print_db: bool,
}

#[derive(Args, Debug)]
struct JsonArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Path to the output JSON file (use - for stdout)
    #[arg(value_name = "DEST")]
    dest: PathBuf,
}

#[derive(Args, Debug)]
struct SqlArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Path to the output SQLite file, SQL text goes to stdout when missing
    #[arg(short = 'o', long = "output", value_name = "DEST")]
    dest: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter.as_str().into()),
        )
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Json(args) => run_json(args, &settings),
        Commands::Sql(args) => run_sql(args, &settings),
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn check_paths(source: &Path, dest: Option<&Path>) -> Result<()> {
    if !source.exists() {
        return Err(XapiError::SourceNotFound { path: source.to_path_buf() });
    }
    if let Some(dest) = dest {
        if dest.is_dir() {
            return Err(XapiError::OutputIsDirectory { path: dest.to_path_buf() });
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap_or(path.as_os_str()).to_string_lossy().into_owned()
}

fn run_json(args: JsonArgs, settings: &Settings) -> Result<()> {
    let to_stdout = args.dest.as_os_str() == "-";
    check_paths(&args.source.xapi_db, (!to_stdout).then_some(args.dest.as_path()))?;
    let (db, version) = xapidb::load(&args.source.xapi_db)?;
    let version = (args.source.print_db || settings.print_db_version).then_some(&version);

    if to_stdout {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_json(&mut handle, &db, version, settings.json_indent)?;
        handle.write_all(b"\n")?;
    } else {
        let file = io::BufWriter::new(fs::File::create(&args.dest)?);
        write_json(file, &db, version, settings.json_indent)?;
        info!(dest = %args.dest.display(), "json written");
        println!(
            "'{}' has been converted and saved to '{}'",
            file_name(&args.source.xapi_db),
            file_name(&args.dest)
        );
    }
    Ok(())
}

fn run_sql(args: SqlArgs, settings: &Settings) -> Result<()> {
    check_paths(&args.source.xapi_db, args.dest.as_deref())?;
    let (db, version) = xapidb::load(&args.source.xapi_db)?;
    let version = (args.source.print_db || settings.print_db_version).then_some(&version);

    match &args.dest {
        Some(dest) => {
            let connection = Connection::open(dest)?;
            Persistor::with_primary_key(&connection, &settings.primary_key).persist_database(&db, version)?;
            info!(dest = %dest.display(), "sqlite database written");
            eprintln!(
                "'{}' has been converted and saved to '{}'",
                file_name(&args.source.xapi_db),
                file_name(dest)
            );
        }
        None => {
            let connection = Connection::open_in_memory()?;
            Persistor::with_primary_key(&connection, &settings.primary_key).persist_database(&db, version)?;
            print!("{}", dump(&connection)?);
        }
    }
    Ok(())
}
