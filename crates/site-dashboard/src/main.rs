mod bootstrap;

use std::path::PathBuf;

use anyhow::Result;
use dashboard_core::settings::Settings;
use dashboard_data::discovery::{default_search_dirs, resolve_data_path};
use dashboard_data::export::{export_dataset, export_summary};
use dashboard_data::loader::DataLoader;
use dashboard_runtime::session::Session;
use dashboard_runtime::snapshot::Controls;
use dashboard_ui::app::App;

fn main() -> Result<()> {
    let settings = Settings::load();
    settings.validate()?;

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(
        &settings.log_level,
        settings.log_file.as_deref(),
        settings.is_tui(),
    )?;

    tracing::info!("Site Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Mode: {}, View: {}, Theme: {}",
        settings.mode,
        settings.view,
        settings.theme
    );

    let data_path = resolve_data_path(settings.data.as_deref(), &default_search_dirs())?;
    let mut session = Session::new(DataLoader::new(data_path), Controls::from_settings(&settings)?);

    // Load errors are fatal: report them before any output is produced.
    session.dataset()?;

    run_exports(&mut session, &settings)?;

    if settings.is_tui() {
        tracing::info!("Starting interactive dashboard...");
        let app = App::new(session, &settings.theme, PathBuf::from("."))?;
        app.run()?;
    } else {
        let snapshot = session.snapshot()?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    Ok(())
}

/// Write the CSV exports requested on the command line.
fn run_exports(session: &mut Session, settings: &Settings) -> Result<()> {
    if settings.export_filtered.is_none() && settings.export_combinations.is_none() {
        return Ok(());
    }

    let (filtered, combinations) = session.export_tables()?;
    if let Some(path) = &settings.export_filtered {
        let written = export_dataset(path, &filtered)?;
        eprintln!("Exported {} filtered rows to {}", filtered.len(), written.display());
    }
    if let Some(path) = &settings.export_combinations {
        let written = export_summary(path, &combinations)?;
        eprintln!(
            "Exported {} combinations to {}",
            combinations.len(),
            written.display()
        );
    }
    Ok(())
}
