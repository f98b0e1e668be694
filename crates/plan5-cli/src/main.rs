//! plan5 command-line client.
//!
//! Inspects the schema catalog, loads an archive directory, and dumps
//! table contents through the query engine.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use comfy_table::Table;
use tracing::debug;

use plan5_core::catalog::Catalog;
use plan5_core::query::{OrderDirection, Predicate};
use plan5_core::registry::{Registry, TableStatus};
use plan5_core::value::Value;

/// plan5, the shift-planning archive reader
#[derive(Parser, Debug)]
#[command(name = "plan5")]
#[command(version, about = "Shift-planning archive reader")]
struct Args {
    /// JSON schema configuration; defaults to the built-in catalog
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Decode cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the declared tables and relations
    Tables,
    /// Load an archive directory and report per-table status
    Load {
        /// Directory holding the DBF files
        dir: PathBuf,
    },
    /// Print rows of one table
    Dump {
        /// Directory holding the DBF files
        dir: PathBuf,
        /// Table name, e.g. 5EMPL
        table: String,
        /// Equality filter, `field=value`; repeatable
        #[arg(long = "where", value_name = "FIELD=VALUE")]
        filters: Vec<String>,
        /// Case-insensitive substring filter, `field=needle`; repeatable
        #[arg(long, value_name = "FIELD=NEEDLE")]
        contains: Vec<String>,
        /// Sort field
        #[arg(long)]
        order_by: Option<String>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        /// Skip the first N rows
        #[arg(long, default_value_t = 0)]
        offset: i64,
        /// Print at most N rows
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("plan5=info".parse().expect("valid directive")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Arc::new(match &args.schema {
        Some(path) => Catalog::from_json_file(path)?,
        None => Catalog::standard(),
    });

    match args.command {
        Command::Tables => print_catalog(&catalog),
        Command::Load { dir } => {
            let registry = make_registry(catalog, args.cache_dir)?;
            let session = registry.load_all(&dir)?;
            print_statuses(&session);
        }
        Command::Dump {
            dir,
            table,
            filters,
            contains,
            order_by,
            desc,
            offset,
            limit,
        } => {
            let registry = make_registry(catalog, args.cache_dir)?;
            let session = registry.load_all(&dir)?;

            let mut query = session.query(&table);
            for filter in &filters {
                let (field, value) = split_arg(filter)?;
                query = query.filter(Predicate::eq(field, parse_value(value)));
            }
            for filter in &contains {
                let (field, needle) = split_arg(filter)?;
                query = query.filter(Predicate::contains(field, needle));
            }
            if let Some(field) = order_by {
                let direction = if desc {
                    OrderDirection::Desc
                } else {
                    OrderDirection::Asc
                };
                query = query.order_by(field, direction);
            }
            let result = query.offset(offset).limit(limit).execute()?;

            debug!(rows = result.len(), "dump query executed");
            print_rows(&result);
        }
    }

    Ok(())
}

fn make_registry(
    catalog: Arc<Catalog>,
    cache_dir: Option<PathBuf>,
) -> Result<Registry, Box<dyn std::error::Error>> {
    Ok(match cache_dir {
        Some(dir) => Registry::with_cache_dir(catalog, dir)?,
        None => Registry::new(catalog),
    })
}

fn print_catalog(catalog: &Catalog) {
    let mut table = Table::new();
    table.set_header(vec!["Table", "Description", "Fields", "Optional"]);
    for def in catalog.tables() {
        table.add_row(vec![
            def.name.clone(),
            def.description.clone(),
            def.fields.len().to_string(),
            if def.optional { "yes" } else { "" }.to_string(),
        ]);
    }
    println!("{table}");
    println!("{} relations declared", catalog.relations().len());
}

fn print_statuses(session: &plan5_core::registry::LoadSession) {
    let mut table = Table::new();
    table.set_header(vec!["Table", "Status", "Records", "Notes"]);

    let mut statuses: Vec<_> = session.statuses().collect();
    statuses.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (name, status) in statuses {
        let row = match status {
            TableStatus::Loaded(loaded) => vec![
                name.to_string(),
                "loaded".to_string(),
                loaded.len().to_string(),
                loaded.notes.join("; "),
            ],
            TableStatus::Failed(error) => vec![
                name.to_string(),
                "failed".to_string(),
                String::new(),
                error.to_string(),
            ],
            TableStatus::Missing => vec![
                name.to_string(),
                "missing".to_string(),
                String::new(),
                String::new(),
            ],
        };
        table.add_row(row);
    }
    println!("{table}");

    let stats = session.stats();
    println!(
        "{} loaded, {} failed, {} missing, {} records total",
        stats.loaded, stats.failed, stats.missing, stats.total_records
    );
    if !session.indexes().unresolved().is_empty() {
        println!(
            "unresolved relations: {}",
            session.indexes().unresolved().join(", ")
        );
    }
}

fn print_rows(result: &plan5_core::query::QueryResult) {
    let Some(first) = result.rows().first() else {
        println!("no rows");
        return;
    };

    let mut table = Table::new();
    let headers: Vec<String> = first
        .base
        .fields()
        .iter()
        .map(|(name, _)| name.clone())
        .collect();
    table.set_header(headers.clone());

    for row in result {
        table.add_row(
            headers
                .iter()
                .map(|field| row.get(field).map(Value::to_string).unwrap_or_default())
                .collect::<Vec<_>>(),
        );
    }
    println!("{table}");
    println!("{} row(s)", result.len());
}

fn split_arg(arg: &str) -> Result<(&str, &str), Box<dyn std::error::Error>> {
    arg.split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got {arg:?}").into())
}

/// Interpret a CLI literal: integer, then decimal, else text.
fn parse_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }
    Value::Text(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_literals() {
        assert_eq!(parse_value("42"), Value::Int(42));
        assert_eq!(parse_value("38.5"), Value::Float(38.5));
        assert_eq!(parse_value("Mustermann"), Value::Text("Mustermann".into()));
    }

    #[test]
    fn test_split_arg() {
        assert_eq!(split_arg("name=Muster").unwrap(), ("name", "Muster"));
        assert!(split_arg("name").is_err());
    }
}
