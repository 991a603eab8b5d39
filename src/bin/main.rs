//! propsql CLI - Generate and run proposition queries
//!
//! Usage:
//!   propsql sql <spec.toml> <entity> [--prop-id <id>]... [--key-id <id>]... [--where <filter>]...
//!   propsql run <spec.toml> <entity> [--connection <name>] [--fetch-size <n>] [--retries <n>]
//!   propsql entities <spec.toml>
//!
//! Examples:
//!   propsql sql backend.toml Patient --key-id P1 --key-id P2 --where "status=active"
//!   propsql sql backend.toml Diagnosis --dialect oracle --order desc
//!   propsql run backend.toml Patient --connection warehouse

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::debug;
use propsql::config::{load_backend_spec, Settings};
use propsql::prelude::*;
use propsql::spec::DirMappingLoader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "propsql")]
#[command(about = "propsql - Compile proposition mappings to SQL and read typed results")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to PROPSQL_CONFIG, ./propsql.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL generated for an entity
    Sql {
        #[command(flatten)]
        query: QueryArgs,

        /// SQL dialect to generate (defaults to the settings file)
        #[arg(short, long)]
        dialect: Option<DialectArg>,
    },

    /// Run the query for an entity and print decoded propositions as JSON lines
    Run {
        #[command(flatten)]
        query: QueryArgs,

        /// Named connection from the settings file
        #[arg(short, long)]
        connection: Option<String>,

        /// Rows buffered from the cursor at a time
        #[arg(long)]
        fetch_size: Option<usize>,

        /// Retries after the first failed attempt
        #[arg(long)]
        retries: Option<u32>,
    },

    /// List the entity specs in a backend spec file
    Entities {
        /// Path to the backend spec file
        spec: PathBuf,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Path to the backend spec file
    spec: PathBuf,

    /// Entity spec to query
    entity: String,

    /// Proposition ids to read (all of the entity's when omitted)
    #[arg(long = "prop-id")]
    prop_ids: Vec<String>,

    /// Restrict to these key ids
    #[arg(long = "key-id")]
    key_ids: Vec<String>,

    /// Property filter: name=value, name!=value, name<value, name<=value, name>value, name>=value
    #[arg(long = "where")]
    filters: Vec<String>,

    /// Order of the time columns
    #[arg(long)]
    order: Option<OrderArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Default,
    Oracle,
    Sqlite,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Default => Dialect::Default,
            DialectArg::Oracle => Dialect::Oracle,
            DialectArg::Sqlite => Dialect::Sqlite,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortDir {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Asc => SortDir::Asc,
            OrderArg::Desc => SortDir::Desc,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Sql { query, dialect } => cmd_sql(&settings, query, dialect),
        Commands::Run {
            query,
            connection,
            fetch_size,
            retries,
        } => cmd_run(&settings, query, connection, fetch_size, retries),
        Commands::Entities { spec } => cmd_entities(&settings, &spec),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_sql(settings: &Settings, args: QueryArgs, dialect: Option<DialectArg>) -> Result<()> {
    let spec = load_spec(settings, &args.spec)?;
    let dialect = dialect.map(Dialect::from).unwrap_or_else(|| {
        let driver = settings
            .default_connection()
            .and_then(|(_, conn)| conn.driver_type().ok());
        settings.sql.dialect_for(driver)
    });
    let generator = SqlGenerator::for_backend(dialect, &spec);

    let entity = spec
        .entity(&args.entity)
        .ok_or_else(|| propsql::spec::SpecError::request(&args.entity, "no such entity spec"))?;
    let request = build_request(entity, &args)?;
    let referenced = spec.referenced_by(entity);
    let query = generator.generate_with(entity, &referenced, &request)?;

    println!("{}", query.sql);
    Ok(())
}

fn cmd_run(
    settings: &Settings,
    args: QueryArgs,
    connection: Option<String>,
    fetch_size: Option<usize>,
    retries: Option<u32>,
) -> Result<()> {
    let spec = load_spec(settings, &args.spec)?;
    let entity = spec
        .entity(&args.entity)
        .cloned()
        .ok_or_else(|| propsql::spec::SpecError::request(&args.entity, "no such entity spec"))?;
    let request = build_request(&entity, &args)?;

    let backend = RelationalBackend::from_settings(spec, settings, connection.as_deref())?;
    let options = ExecOptions {
        fetch_size: fetch_size.unwrap_or(settings.executor.fetch_size),
        retries: retries.unwrap_or(settings.executor.retries),
    };

    let mut stream = backend.generate_and_execute(entity.name(), &request, options)?;
    for proposition in stream.by_ref() {
        let proposition = proposition?;
        match serde_json::to_string(&proposition) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Error serializing {}: {}", proposition.unique_id(), e),
        }
    }
    debug!(
        "{} rows read, {} skipped",
        stream.rows_read(),
        stream.rows_skipped()
    );
    Ok(())
}

fn cmd_entities(settings: &Settings, path: &Path) -> Result<()> {
    let spec = load_spec(settings, path)?;

    println!("File: {}", path.display());
    println!();
    for entity in spec.entities() {
        println!("  - {} ({:?})", entity.name(), entity.kind());
        if !entity.description().is_empty() {
            println!("      {}", entity.description());
        }
        println!("      propositions: {}", entity.prop_ids().join(", "));
        if !entity.properties().is_empty() {
            let names: Vec<&str> = entity.properties().iter().map(|p| p.name.as_str()).collect();
            println!("      properties: {}", names.join(", "));
        }
    }
    if !spec.staging().is_empty() {
        println!();
        println!("Staging:");
        for staging in spec.staging() {
            println!(
                "  - {} -> {} (for {})",
                staging.replaced(),
                staging.staging_area(),
                staging.entity_specs().join(", ")
            );
        }
    }
    Ok(())
}

/// Load a backend spec, resolving mapping resources from the configured
/// directory or else next to the backend spec file.
fn load_spec(settings: &Settings, path: &Path) -> Result<BackendSpec> {
    let dir = match settings.mappings.resolved_dir()? {
        Some(dir) => dir,
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let loader = DirMappingLoader::new(dir);
    Ok(load_backend_spec(path, &loader)?)
}

fn build_request(entity: &EntitySpec, args: &QueryArgs) -> Result<QueryRequest> {
    let prop_ids: Vec<String> = if args.prop_ids.is_empty() {
        entity.prop_ids().to_vec()
    } else {
        args.prop_ids.clone()
    };

    let mut request = QueryRequest::new(prop_ids.clone()).with_key_ids(args.key_ids.clone());
    if let Some(order) = args.order {
        request = request.with_order(order.into());
    }
    for text in &args.filters {
        request = request.with_filter(parse_filter(entity, &prop_ids, text)?);
    }
    Ok(request)
}

fn parse_filter(entity: &EntitySpec, prop_ids: &[String], text: &str) -> Result<PropertyValueFilter> {
    // Longest operators first so that "<=" is not read as "<".
    const OPERATORS: [(&str, Comparator); 6] = [
        ("!=", Comparator::NotEqualTo),
        ("<=", Comparator::LessThanOrEqualTo),
        (">=", Comparator::GreaterThanOrEqualTo),
        ("=", Comparator::EqualTo),
        ("<", Comparator::LessThan),
        (">", Comparator::GreaterThan),
    ];

    let invalid = || propsql::spec::SpecError::InvalidFilter(format!("cannot parse '{}'", text));
    let (name, comparator, raw) = OPERATORS
        .iter()
        .find_map(|(op, cmp)| {
            text.split_once(op)
                .map(|(name, value)| (name.trim(), *cmp, value.trim()))
        })
        .ok_or_else(invalid)?;

    let property = entity.property(name).ok_or_else(|| {
        propsql::spec::SpecError::request(entity.name(), format!("no property named '{}'", name))
    })?;
    // Coded properties are filtered by their decoded value.
    let value_type = match property.mappings {
        Some(_) => ValueType::Nominal,
        None => property.value_type,
    };
    let value = Value::parse(raw, value_type).ok_or_else(invalid)?;

    Ok(PropertyValueFilter::new(
        prop_ids.to_vec(),
        name,
        comparator,
        vec![value],
    )?)
}
