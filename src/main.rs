use anyhow::{Context, Result};
use config::PipelineConfig;
use polars::prelude::DataFrame;
use processor::{
    BomGrossCleaner, RatingsCleaner, RevenueMerger, TitleBasicsCleaner, TnBudgetsCleaner,
};
use report::ChartRenderer;
use report::aggregates;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

mod config;
mod models;
mod processor;
mod report;
mod storage;

const DEFAULT_CONFIG_PATH: &str = "src/configs/pipeline.toml";

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let no_charts = env::args().any(|arg| arg == "--no-charts");
    let config_path = env::args()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = PipelineConfig::from_file(Path::new(&config_path))
        .with_context(|| format!("Failed to load pipeline configuration from {config_path}"))?;

    info!(
        "🚀 Starting box-office ETL pipeline (release years {}-{})",
        config.filters.year_min, config.filters.year_max
    );

    // Unpack any .gz archives that still shadow their raw CSV files.
    let archives = [
        &config.files.title_basics,
        &config.files.title_ratings,
        &config.files.bom_gross,
        &config.files.tn_budgets,
    ];
    for files in archives {
        let Some(zip) = &files.zip else { continue };
        let src = config.data_path(zip);
        if !src.exists() {
            continue;
        }
        let dest = config.data_path(&files.raw);
        match storage::unpack_gz(&src, &dest) {
            Ok(()) => info!("📦 Decompressed {} to {}", src.display(), dest.display()),
            Err(e) => error!("❌ Failed to decompress {}: {:#}", src.display(), e),
        }
    }

    // Clean each raw source into its "clean" CSV file.
    type CleanFn = fn(&PipelineConfig) -> Result<DataFrame>;
    let sources: [(&str, CleanFn); 4] = [
        ("imdb_title_basics", |cfg| TitleBasicsCleaner.clean(cfg)),
        ("imdb_title_ratings", |cfg| RatingsCleaner.clean(cfg)),
        ("bom_movie_gross", |cfg| BomGrossCleaner::new().clean(cfg)),
        ("tn_movie_budgets", |cfg| TnBudgetsCleaner::new().clean(cfg)),
    ];

    let mut successful_sources = 0;
    for (source_name, clean) in &sources {
        info!("\n=== Cleaning source: {} ===", source_name);
        match clean(&config) {
            Ok(df) => {
                info!("✅ Successfully cleaned {} with {} rows", source_name, df.height());
                successful_sources += 1;
            }
            Err(e) => {
                error!("❌ Failed to clean {}: {:#}", source_name, e);
                // Continue with the remaining sources even if one fails
            }
        }
    }
    info!(
        "✅ Cleaned {} out of {} sources",
        successful_sources,
        sources.len()
    );
    if successful_sources == 0 {
        anyhow::bail!("No source was cleaned successfully");
    }

    // The merge needs every clean file; a missing one is fatal here.
    info!("\n=== Merging cleaned sources ===");
    let merged = RevenueMerger
        .merge_all(&config)
        .context("Failed to merge cleaned sources")?;
    info!("📊 Merged dataset written with {} rows", merged.height());

    if no_charts {
        info!("🎉 Pipeline completed (charts skipped)");
        return Ok(());
    }

    info!("\n=== Rendering charts ===");
    let rows = aggregates::extract_titles(&merged)?;
    let renderer = ChartRenderer::new(&config);
    let revenue_bars = 10.min(config.charts.max_bars);
    let rating_bars = 15.min(config.charts.max_bars);

    type ChartFn<'a> = Box<dyn Fn() -> Result<PathBuf> + 'a>;
    let charts: [(&str, ChartFn<'_>); 6] = [
        (
            "top_genres_by_revenue",
            Box::new(|| renderer.top_genres_by_revenue(&rows, revenue_bars)),
        ),
        (
            "top_genres_by_avg_revenue",
            Box::new(|| renderer.top_genres_by_avg_revenue(&rows, revenue_bars)),
        ),
        (
            "top_genres_by_weighted_rating",
            Box::new(|| renderer.top_genres_by_weighted_rating(&rows, rating_bars)),
        ),
        (
            "title_rating_vs_revenue",
            Box::new(|| renderer.title_rating_vs_revenue(&rows)),
        ),
        ("runtime_vs_revenue", Box::new(|| renderer.runtime_vs_revenue(&rows))),
        ("runtime_vs_rating", Box::new(|| renderer.runtime_vs_rating(&rows))),
    ];

    let mut successful_charts = 0;
    for (chart_name, render) in &charts {
        match render() {
            Ok(_) => successful_charts += 1,
            Err(e) => error!("❌ Failed to render {}: {:#}", chart_name, e),
        }
    }

    let stats = aggregates::genre_rating_stats(
        &rows,
        config.filters.votes_per_title_min,
        config.charts.min_titles_per_genre,
    );
    let top_genres = aggregates::top_genre_names(&stats, rating_bars);
    info!("📊 Top rated genres: {}", top_genres.join(", "));

    info!("\n=== Pipeline Summary ===");
    info!("✅ Sources cleaned: {} of {}", successful_sources, sources.len());
    info!("✅ Charts rendered: {} of {}", successful_charts, charts.len());
    if successful_charts == charts.len() {
        info!("🎉 Box-office pipeline completed successfully!");
    } else {
        warn!("⚠️ Pipeline completed with failed charts");
    }

    Ok(())
}
