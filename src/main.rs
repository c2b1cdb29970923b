use anyhow::{Context, Result};
use geonames_cities::{
    build_database,
    cli::{BuildArgs, Cli, Commands, QueryArgs},
    config::default_database_path,
    download::{resolve_sources, CacheManager, GeonamesClient, GeonamesDownloader, LocalDir},
    BuildOptions, CityDatabase, CityField, ConnectOptions, ConsoleUi, KeyValueRow, RowMappers,
    SourceFiles,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("geonames_cities=info".parse()?),
        )
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Sync {
            output_db,
            build,
            force,
            cache_dir,
        } => {
            let start = Instant::now();
            let output_db = database_path(output_db)?;
            let mut ui = ConsoleUi::new();

            let cache = CacheManager::new(cache_dir)?;
            let mut source = GeonamesDownloader::new(GeonamesClient::new()?, cache, force, &mut ui);
            let sources = resolve_sources(&mut source, build.cities)?;

            run_build(&mut ui, &sources, &output_db, build, start)?;
        }

        Commands::Download {
            output,
            cities,
            force,
        } => {
            let mut ui = ConsoleUi::new();
            let cache = CacheManager::new(output)?;
            let mut source = GeonamesDownloader::new(GeonamesClient::new()?, cache, force, &mut ui);
            let sources = resolve_sources(&mut source, cities)?;
            println!("Dumps downloaded to {:?}", source.cache_dir());
            info!(?sources, "download complete");
        }

        Commands::Build {
            input_dir,
            output_db,
            build,
        } => {
            let start = Instant::now();
            let mut ui = ConsoleUi::new();
            let sources = {
                let mut source = LocalDir::new(&input_dir, &mut ui);
                resolve_sources(&mut source, build.cities)?
            };

            run_build(&mut ui, &sources, &output_db, build, start)?;
        }

        Commands::Search {
            query,
            query_args,
            limit,
        } => {
            let db = open(&query_args)?;
            print_rows(db.search(&query, query_args.lang.as_deref(), limit)?)?;
        }

        Commands::Get { id, query_args } => {
            let db = open(&query_args)?;
            match db.get_by_id(id, query_args.lang.as_deref())? {
                Some(row) => print_rows([row])?,
                None => eprintln!("No city with id {}", id),
            }
        }

        Commands::Nearest {
            latitude,
            longitude,
            query_args,
            limit,
        } => {
            let db = open(&query_args)?;
            print_rows(db.get_nearest(
                latitude,
                longitude,
                query_args.lang.as_deref(),
                Some(limit),
            )?)?;
        }

        Commands::Languages { db } => {
            let mut cities = CityDatabase::<KeyValueRow>::new(&[], &RowMappers::default())?;
            cities.connect(database_path(db)?, &ConnectOptions::default())?;
            for lang in cities.supported_languages()? {
                println!("{}", lang);
            }
            cities.close()?;
        }

        Commands::ListFields => {
            println!("Available fields:\n");
            for field in CityField::ALL {
                let note = if field.is_localized() { " (localized)" } else { "" };
                println!("  {}{}", field, note);
            }
        }
    }

    Ok(())
}

fn database_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => default_database_path(),
    }
}

fn run_build(
    ui: &mut ConsoleUi,
    sources: &SourceFiles,
    output_db: &Path,
    build: BuildArgs,
    start: Instant,
) -> Result<()> {
    if let Some(parent) = output_db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }

    let options = BuildOptions {
        languages: build.languages,
    };
    let summary = build_database(sources, output_db, &options, ui)?;

    println!(
        "\nCreated {:?} ({} records, languages: {}) in {:.1}s",
        output_db,
        summary.total_records(),
        summary.languages.join(","),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn open(args: &QueryArgs) -> Result<CityDatabase<KeyValueRow>> {
    let mut db = CityDatabase::<KeyValueRow>::from_field_names(&args.fields, &RowMappers::default())?;
    db.connect(database_path(args.db.clone())?, &ConnectOptions::default())?;
    Ok(db)
}

fn print_rows(rows: impl IntoIterator<Item = KeyValueRow>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for row in rows {
        serde_json::to_writer(&mut out, &row)?;
        writeln!(out)?;
    }
    Ok(())
}
