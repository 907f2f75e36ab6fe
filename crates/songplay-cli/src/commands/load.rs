use anyhow::{Context, Result};
use std::path::Path;

use songplay_core::schema::Database;
use songplay_etl::{BatchReport, BatchRunner, Config};

/// Load the catalog tree, then the event tree.
///
/// Returns an error if the store is unreachable or if any file failed to
/// load, so the process exits nonzero.
pub fn run_load(config: &Config, song_root: &Path, log_root: &Path) -> Result<()> {
    let mut db = Database::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.database_path.display()
        )
    })?;
    let runner = BatchRunner::from_config(config)?;
    log::info!(
        "Loading catalog from {} and events from {}",
        song_root.display(),
        log_root.display()
    );

    let (catalog, events) = runner
        .run_all(&mut db, song_root, log_root)
        .context("Load aborted")?;

    print_report(&catalog);
    print_report(&events);

    let failed = catalog.failures.len() + events.failures.len();
    if failed > 0 {
        anyhow::bail!("{failed} file(s) failed to load");
    }

    println!("\n✓ Load complete");
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!(
        "\n{} files: {}/{} loaded",
        report.kind, report.files_loaded, report.files_found
    );

    let t = &report.totals;
    match report.kind {
        songplay_etl::SourceKind::Catalog => {
            println!("  songs: {}  artists: {}", t.songs, t.artists);
        }
        songplay_etl::SourceKind::Events => {
            println!(
                "  songplays: {} ({} matched)  users: {}  time: {}",
                t.songplays, t.matched, t.users, t.time
            );
        }
    }

    for failure in &report.failures {
        eprintln!("  ✗ {}: {}", failure.path.display(), failure.error);
    }
}
