//! Quarry CLI - inspect catalogs and run reports
//!
//! Usage:
//!   quarry tables <catalog.toml>
//!   quarry describe <catalog.toml> <table>
//!   quarry run <catalog.toml> <data.json> --report <id> [--table <primary>]
//!              [--page N] [--sort table.column] [--desc] [--search text]
//!              [--format table|csv]
//!
//! Examples:
//!   quarry describe demos/hr.toml employees
//!   quarry run demos/hr.toml demos/hr.json --report staff --sort employees.last_name

use clap::{Parser, Subcommand, ValueEnum};
use quarry::auth::StaticAccess;
use quarry::config::Settings;
use quarry::executor::{InMemoryDataSource, PagedResult, QueryExecutor, SortDirection, SortSpec};
use quarry::export::to_csv;
use quarry::preferences::{DirectoryBackup, PreferenceStore, SqlitePreferenceStore};
use quarry::schema::{FieldRef, SchemaCatalog};
use quarry::session::ReportSession;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Quarry - build and run reports over related tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tables of a catalog
    Tables {
        /// Path to the catalog (.toml or .json)
        catalog: PathBuf,
    },

    /// Show the columns and foreign keys of a table
    Describe {
        /// Path to the catalog (.toml or .json)
        catalog: PathBuf,

        /// Table name
        table: String,
    },

    /// Run a report with its saved preferences
    Run {
        /// Path to the catalog (.toml or .json)
        catalog: PathBuf,

        /// JSON file with rows per table
        data: PathBuf,

        /// Report identifier used for saved preferences
        #[arg(short, long)]
        report: String,

        /// Primary table (defaults to the first catalog table)
        #[arg(short, long)]
        table: Option<String>,

        /// 0-based page index
        #[arg(short, long, default_value_t = 0)]
        page: usize,

        /// Sort column as table.column
        #[arg(short, long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Case-insensitive text search over selected columns
        #[arg(long)]
        search: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Aligned text table
    Table,
    /// CSV with quoted cells
    Csv,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tables { catalog } => cmd_tables(catalog),
        Commands::Describe { catalog, table } => cmd_describe(catalog, table),
        Commands::Run {
            catalog,
            data,
            report,
            table,
            page,
            sort,
            desc,
            search,
            format,
        } => {
            let options = RunOptions {
                report,
                table,
                page,
                sort,
                desc,
                search,
                format,
            };
            cmd_run(catalog, data, options).await
        }
    }
}

fn load_catalog(path: &PathBuf) -> Option<SchemaCatalog> {
    match SchemaCatalog::from_file(path) {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            eprintln!("Error loading catalog '{}': {}", path.display(), e);
            None
        }
    }
}

fn cmd_tables(path: PathBuf) -> ExitCode {
    let Some(catalog) = load_catalog(&path) else {
        return ExitCode::FAILURE;
    };

    println!("Catalog: {}", path.display());
    println!();
    println!("Tables:");
    for table in catalog.tables() {
        println!(
            "  - {} ({} columns, {} foreign keys)",
            table.name,
            table.column_count(),
            table.foreign_keys.len()
        );
    }
    ExitCode::SUCCESS
}

fn cmd_describe(path: PathBuf, name: String) -> ExitCode {
    let Some(catalog) = load_catalog(&path) else {
        return ExitCode::FAILURE;
    };
    let table = match catalog.get_table(&name) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Table: {}", table.name);
    println!();
    println!("Columns:");
    for column in &table.columns {
        let mut details = vec![column.semantic_type.to_string()];
        if column.nullable {
            details.push("nullable".to_string());
        }
        if let Some(format) = &column.format {
            details.push(format!("format {}", format));
        }
        if let Some(calculation) = &column.calculation {
            details.push(format!("calculation {}", calculation));
        }
        println!(
            "  - {} \"{}\" ({})",
            column.name,
            column.display_label(),
            details.join(", ")
        );
    }

    if !table.foreign_keys.is_empty() {
        println!();
        println!("Foreign keys:");
        for fk in &table.foreign_keys {
            println!(
                "  - {} -> {}.{}",
                fk.column, fk.references_table, fk.references_column
            );
        }
    }

    let reachable = catalog
        .join_graph()
        .reachable_tables(&table.name)
        .unwrap_or_default();
    if !reachable.is_empty() {
        println!();
        println!("Joinable tables: {}", reachable.join(", "));
    }
    ExitCode::SUCCESS
}

struct RunOptions {
    report: String,
    table: Option<String>,
    page: usize,
    sort: Option<String>,
    desc: bool,
    search: Option<String>,
    format: OutputFormat,
}

async fn cmd_run(catalog_path: PathBuf, data_path: PathBuf, options: RunOptions) -> ExitCode {
    match run(catalog_path, data_path, options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    catalog_path: PathBuf,
    data_path: PathBuf,
    options: RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    let catalog = Arc::new(SchemaCatalog::from_file(&catalog_path)?);

    let primary = match options.table {
        Some(table) => table,
        None => catalog
            .list_tables()
            .first()
            .map(|t| t.to_string())
            .ok_or("catalog has no tables")?,
    };

    let data = fs::read_to_string(&data_path)?;
    let source = InMemoryDataSource::from_json_str(Arc::clone(&catalog), &data)?;
    let executor = QueryExecutor::new(Arc::clone(&catalog), Arc::new(source))
        .with_page_size(settings.execution.page_size);

    let local = SqlitePreferenceStore::open(settings.storage.resolved_local_path()?)?;
    let mut store = PreferenceStore::new(Arc::new(local));
    if let Some(dir) = settings.backup.resolved_directory()? {
        store = store.with_remote(Arc::new(DirectoryBackup::new(dir)));
    }

    let mut session = ReportSession::open(
        &options.report,
        &primary,
        executor,
        &store,
        Arc::new(StaticAccess::read_only()),
    )
    .await?;

    if let Some(sort) = options.sort {
        let column: FieldRef = sort.parse()?;
        let direction = if options.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        session.set_sort(Some(SortSpec { column, direction }))?;
    }
    session.set_search(options.search);
    session.set_page(options.page);

    let result = session.execute().await?;
    match options.format {
        OutputFormat::Csv => print!("{}", to_csv(&result)?),
        OutputFormat::Table => print_table(&catalog, &result),
    }
    Ok(())
}

fn print_table(catalog: &SchemaCatalog, result: &PagedResult) {
    let headers: Vec<String> = result
        .columns
        .iter()
        .map(|c| {
            catalog
                .resolve(c)
                .map(|col| col.display_label())
                .unwrap_or_else(|_| c.key())
        })
        .collect();
    let keys: Vec<String> = result.columns.iter().map(|c| c.key()).collect();
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            keys.iter()
                .map(|k| row.get(k).map(|v| v.to_string()).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(&headers));
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")
    );
    for row in &cells {
        println!("{}", line(row));
    }
    println!();
    println!(
        "{} rows, page {} of {}",
        result.total_rows,
        if result.page.total_pages == 0 { 0 } else { result.page.index + 1 },
        result.page.total_pages
    );
}
