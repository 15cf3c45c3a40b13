//! Subcommand definitions and dispatch for `musiclib`.

use crate::core::errors::{LibraryError, OperationOutcome};
use crate::migration::{MigrationEngine, MigrationRequest, MigrationType};
use crate::query::{QueryEngine, QueryRequest, SortField, SortOrder};
use crate::scanner::Scanner;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "musiclib", version, about = "Indexes and migrates a local music collection")]
pub struct Cli {
    /// Overrides MUSIC_ROOT_PATH for this invocation.
    #[arg(long, global = true)]
    pub music_root: Option<PathBuf>,

    /// Print the full structured result as JSON instead of a short summary.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Walk the music root, reconciling metadata and rebuilding the index.
    Scan,
    /// List bands with optional filters, sorting, and pagination.
    Query {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        include_albums: bool,
        #[arg(long, value_enum, default_value_t = SortFieldArg::Name)]
        sort: SortFieldArg,
        #[arg(long)]
        descending: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        page_size: usize,
    },
    /// Migrate one band's folder structure to a different naming convention.
    Migrate {
        band: String,
        #[arg(value_enum)]
        migration_type: MigrationTypeArg,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        no_backup: bool,
    },
    /// Report collection-wide structure compliance statistics.
    Validate,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortFieldArg {
    Name,
    AlbumsCount,
    LastUpdated,
    Completion,
    Compliance,
}

impl From<SortFieldArg> for SortField {
    fn from(value: SortFieldArg) -> Self {
        match value {
            SortFieldArg::Name => SortField::Name,
            SortFieldArg::AlbumsCount => SortField::AlbumsCount,
            SortFieldArg::LastUpdated => SortField::LastUpdated,
            SortFieldArg::Completion => SortField::Completion,
            SortFieldArg::Compliance => SortField::Compliance,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MigrationTypeArg {
    DefaultToEnhanced,
    LegacyToDefault,
    MixedToEnhanced,
    EnhancedToDefault,
}

impl From<MigrationTypeArg> for MigrationType {
    fn from(value: MigrationTypeArg) -> Self {
        match value {
            MigrationTypeArg::DefaultToEnhanced => MigrationType::DefaultToEnhanced,
            MigrationTypeArg::LegacyToDefault => MigrationType::LegacyToDefault,
            MigrationTypeArg::MixedToEnhanced => MigrationType::MixedToEnhanced,
            MigrationTypeArg::EnhancedToDefault => MigrationType::EnhancedToDefault,
        }
    }
}

fn resolve_music_root(cli: &Cli) -> Result<PathBuf, LibraryError> {
    if let Some(root) = &cli.music_root {
        return Ok(root.clone());
    }
    crate::core::config::LibraryConfig::from_env().map(|c| c.music_root)
}

/// Run the parsed CLI, printing either a JSON `OperationOutcome` or a short
/// human summary, and return a process exit code.
pub fn run(cli: Cli) -> i32 {
    let music_root = match resolve_music_root(&cli) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    match &cli.command {
        Command::Scan => {
            let scanner = Scanner::new();
            let outcome = OperationOutcome::from_result("scan", scanner.scan(&music_root));
            print_outcome(&outcome, cli.json, |index| {
                println!("scanned {} band(s)", index.bands.len());
            });
            exit_code_for(&outcome)
        }
        Command::Query {
            search,
            genre,
            include_albums,
            sort,
            descending,
            page,
            page_size,
        } => {
            let engine = QueryEngine::new();
            let mut request = QueryRequest::default();
            request.filters.search = search.clone();
            request.filters.genre = genre.clone();
            request.filters.include_albums = *include_albums;
            request.sort_field = (*sort).into();
            request.sort_order = if *descending {
                SortOrder::Descending
            } else {
                SortOrder::Ascending
            };
            request.page = *page;
            request.page_size = *page_size;

            let outcome = OperationOutcome::from_result("query", engine.query(&music_root, request));
            print_outcome(&outcome, cli.json, |response| {
                for band in &response.bands {
                    println!("{} ({} albums)", band.name, band.albums_count);
                }
                println!(
                    "page {}/{} ({} total)",
                    response.page, response.page_count, response.total_count
                );
            });
            exit_code_for(&outcome)
        }
        Command::Migrate {
            band,
            migration_type,
            dry_run,
            force,
            no_backup,
        } => {
            let engine = MigrationEngine::new();
            let mut request = MigrationRequest::new(band.clone(), (*migration_type).into());
            request.dry_run = *dry_run;
            request.force = *force;
            request.backup_original = !no_backup;

            let result = engine
                .migrate_band_structure(&music_root, request)
                .map(|(result, _log)| result);
            let outcome = OperationOutcome::from_result("migrate", result);
            print_outcome(&outcome, cli.json, |result| {
                println!(
                    "{}: {:?} ({} migrated, {} failed)",
                    band, result.status, result.albums_migrated, result.albums_failed
                );
            });
            exit_code_for(&outcome)
        }
        Command::Validate => {
            let scanner = Scanner::new();
            let outcome = OperationOutcome::from_result("validate", scanner.scan(&music_root));
            print_outcome(&outcome, cli.json, |index| {
                println!(
                    "{} bands, {:.1}% complete",
                    index.stats.total_bands, index.stats.completion_percentage
                );
            });
            exit_code_for(&outcome)
        }
    }
}

fn print_outcome<T: serde::Serialize>(
    outcome: &OperationOutcome<T>,
    as_json: bool,
    summarize: impl FnOnce(&T),
) {
    if as_json {
        match serde_json::to_string_pretty(outcome) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("error serializing result: {}", e),
        }
    } else {
        match &outcome.data {
            Some(data) => summarize(data),
            None => eprintln!("{}", outcome.message),
        }
    }
}

fn exit_code_for<T>(outcome: &OperationOutcome<T>) -> i32 {
    match outcome.status {
        crate::core::errors::OperationStatus::Success => 0,
        crate::core::errors::OperationStatus::Error => 1,
    }
}
