//! Bike-sharing dashboard - JSON report and SVG charts per view

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs::File;
use std::io::BufWriter;

use bikeshare_dashboard::app::Dashboard;
use bikeshare_dashboard::charts::ChartRenderer;
use bikeshare_dashboard::cli::Cli;
use bikeshare_dashboard::config::DashboardConfig;
use bikeshare_dashboard::data::DatasetCache;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    cli.apply_to(&mut config);
    config.validate()?;

    let dashboard = Dashboard::new(DatasetCache::new(config.data.clone()));
    let requests = config.requests();
    let outcomes = dashboard
        .views(&requests)
        .context("Failed to load the rental tables")?;

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {}", config.output_dir.display())
    })?;

    let report_path = config.output_dir.join("report.json");
    let file = File::create(&report_path)
        .with_context(|| format!("Failed to create {}", report_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &outcomes)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    info!("Wrote report {}", report_path.display());

    for outcome in outcomes.iter().filter(|o| o.is_empty()) {
        warn!("'{}': no rows match the current filters", outcome.view());
    }

    if config.charts {
        let renderer = ChartRenderer::new(&config.output_dir);
        let mut written = 0;
        for outcome in &outcomes {
            written += renderer.render(outcome).context("Failed to render charts")?.len();
        }
        info!("Wrote {written} charts to {}", config.output_dir.display());
    }

    Ok(())
}
