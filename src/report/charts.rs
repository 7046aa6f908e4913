use anyhow::{Result, bail};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::PathBuf;
use tracing::info;

use crate::config::PipelineConfig;
use crate::models::{IntervalStats, MergedTitle};
use crate::processor::filters;
use crate::report::aggregates::{self, GrossComponent};

const ORANGE: RGBColor = RGBColor(255, 165, 0);

/// The (a, b] rating buckets used by the interval bar charts.
const RATING_INTERVALS: [(f64, f64); 8] = [
    (1.0, 2.0),
    (2.0, 3.0),
    (3.0, 4.0),
    (4.0, 5.0),
    (5.0, 6.0),
    (6.0, 7.0),
    (7.0, 8.0),
    (8.0, 9.0),
];

/// Upper sanity bound on worldwide gross; figures beyond it are treated as
/// data glitches and excluded from the rating/revenue charts.
const WORLDWIDE_GROSS_CAP: f64 = 100e9;

struct BarEntry {
    name: String,
    value: f64,
    error: Option<f64>,
    label: String,
}

/// Renders the summary PNG charts from the merged dataset.
pub struct ChartRenderer {
    out_dir: PathBuf,
    max_bars: usize,
    min_titles_per_genre: usize,
    votes_per_title_min: u64,
}

impl ChartRenderer {
    pub fn new(config: &PipelineConfig) -> Self {
        ChartRenderer {
            out_dir: config.folders.charts.clone(),
            max_bars: config.charts.max_bars,
            min_titles_per_genre: config.charts.min_titles_per_genre,
            votes_per_title_min: config.filters.votes_per_title_min,
        }
    }

    fn check_bar_budget(&self, requested: usize) -> Result<()> {
        if requested > self.max_bars {
            bail!(
                "Requested {} bars exceeds the configured upper bound of {}",
                requested,
                self.max_bars
            );
        }
        Ok(())
    }

    fn output_file(&self, name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.out_dir)?;
        Ok(self.out_dir.join(name))
    }

    /// Three stacked panels ranking genres by total worldwide, domestic and
    /// foreign gross, in billions.
    pub fn top_genres_by_revenue(&self, rows: &[MergedTitle], max_genres: usize) -> Result<PathBuf> {
        self.check_bar_budget(max_genres)?;
        let path = self.output_file("top_genres_by_revenue.png")?;

        let components: [(GrossComponent, &'static RGBColor); 3] = [
            (GrossComponent::Worldwide, &RED),
            (GrossComponent::Domestic, &ORANGE),
            (GrossComponent::Foreign, &GREEN),
        ];
        let panels: Vec<(String, &'static RGBColor, Vec<BarEntry>)> = components
            .iter()
            .map(|&(component, color)| {
                let entries: Vec<BarEntry> = aggregates::genre_revenue_totals(rows, component)
                    .into_iter()
                    .take(max_genres)
                    .map(|t| {
                        let value = t.total_gross as f64 / 1e9;
                        BarEntry {
                            name: t.genre,
                            value,
                            error: None,
                            label: format!("{value:.1}"),
                        }
                    })
                    .collect();
                (format!("{} Gross ($b)", component.label()), color, entries)
            })
            .collect();

        let x_max = panels
            .iter()
            .flat_map(|(_, _, entries)| entries.iter().map(|e| e.value))
            .fold(1.0, f64::max)
            + 1.5;

        let root = BitMapBackend::new(&path, (1000, 800)).into_drawing_area();
        root.fill(&WHITE)?;
        let areas = root.split_evenly((3, 1));
        for (i, (series_label, color, entries)) in panels.iter().enumerate() {
            let caption = (i == 0)
                .then(|| format!("Top {max_genres} Genres by Gross Revenue"));
            draw_bar_panel(&areas[i], caption.as_deref(), series_label, entries, x_max, "billion ($)", *color)?;
        }
        root.present()?;
        info!("Wrote chart {}", path.display());
        Ok(path.clone())
    }

    /// Three stacked panels ranking genres by average gross per title, in
    /// millions, annotated with the standard error of the mean.
    pub fn top_genres_by_avg_revenue(&self, rows: &[MergedTitle], max_genres: usize) -> Result<PathBuf> {
        self.check_bar_budget(max_genres)?;
        let path = self.output_file("top_genres_by_avg_revenue.png")?;

        let components: [(GrossComponent, &'static RGBColor); 3] = [
            (GrossComponent::Worldwide, &RED),
            (GrossComponent::Domestic, &ORANGE),
            (GrossComponent::Foreign, &GREEN),
        ];
        let panels: Vec<(String, &'static RGBColor, Vec<BarEntry>)> = components
            .iter()
            .map(|&(component, color)| {
                let entries: Vec<BarEntry> =
                    aggregates::genre_revenue_means(rows, component, self.min_titles_per_genre)
                        .into_iter()
                        .take(max_genres)
                        .map(|m| {
                            let value = m.mean / 1e6;
                            let error = m.stderr / 1e6;
                            BarEntry {
                                name: m.genre,
                                value,
                                error: Some(error),
                                label: format!("{value:.0}±{error:.0} | titles: {}", m.title_count),
                            }
                        })
                        .collect();
                (format!("{} Average ($m)", component.label()), color, entries)
            })
            .collect();

        let x_max = panels
            .iter()
            .flat_map(|(_, _, entries)| entries.iter().map(|e| e.value))
            .fold(1.0, f64::max)
            + 220.0;

        let root = BitMapBackend::new(&path, (1000, 800)).into_drawing_area();
        root.fill(&WHITE)?;
        let areas = root.split_evenly((3, 1));
        for (i, (series_label, color, entries)) in panels.iter().enumerate() {
            let caption = (i == 0)
                .then(|| format!("Top {max_genres} Genres by Average Gross Revenue per Title"));
            draw_bar_panel(&areas[i], caption.as_deref(), series_label, entries, x_max, "million ($)", *color)?;
        }
        root.present()?;
        info!("Wrote chart {}", path.display());
        Ok(path.clone())
    }

    /// Two panels: genres ranked by vote-weighted average rating and by plain
    /// average rating, annotated with the matching dispersion figure.
    pub fn top_genres_by_weighted_rating(&self, rows: &[MergedTitle], max_genres: usize) -> Result<PathBuf> {
        self.check_bar_budget(max_genres)?;
        let path = self.output_file("top_genres_by_weighted_rating.png")?;

        let stats =
            aggregates::genre_rating_stats(rows, self.votes_per_title_min, self.min_titles_per_genre);

        let weighted: Vec<BarEntry> = stats
            .iter()
            .take(max_genres)
            .map(|s| BarEntry {
                name: s.genre.clone(),
                value: s.weighted_rating,
                error: Some(s.weighted_stdev),
                label: format!(
                    "{:.1}±{:.2} | votes: {:.0}e3",
                    s.weighted_rating,
                    s.weighted_stdev,
                    s.total_votes as f64 / 1e3
                ),
            })
            .collect();

        let mut by_mean: Vec<_> = stats.iter().collect();
        by_mean.sort_by(|a, b| b.mean_rating.total_cmp(&a.mean_rating).then(a.genre.cmp(&b.genre)));
        let plain: Vec<BarEntry> = by_mean
            .into_iter()
            .take(max_genres)
            .map(|s| BarEntry {
                name: s.genre.clone(),
                value: s.mean_rating,
                error: Some(s.rating_stdev),
                label: format!(
                    "{:.1}±{:.2} | votes: {:.0}e3",
                    s.mean_rating,
                    s.rating_stdev,
                    s.total_votes as f64 / 1e3
                ),
            })
            .collect();

        let x_max = weighted
            .iter()
            .chain(plain.iter())
            .map(|e| e.value)
            .fold(1.0, f64::max)
            + 3.5;

        let root = BitMapBackend::new(&path, (1000, 800)).into_drawing_area();
        root.fill(&WHITE)?;
        let areas = root.split_evenly((2, 1));
        draw_bar_panel(
            &areas[0],
            Some(&format!("Top {max_genres} Genres by Weighted Avg Title Rating")),
            "Weighted Avg Rating",
            &weighted,
            x_max,
            "rating (1-10)",
            &BLUE,
        )?;
        draw_bar_panel(
            &areas[1],
            Some(&format!("Top {max_genres} Genres by Avg Title Rating")),
            "Avg Rating",
            &plain,
            x_max,
            "rating (1-10)",
            &BLUE,
        )?;
        root.present()?;
        info!("Wrote chart {}", path.display());
        Ok(path.clone())
    }

    /// Mean revenue per rating interval (bars) over a title-level
    /// rating/revenue scatter.
    pub fn title_rating_vs_revenue(&self, rows: &[MergedTitle]) -> Result<PathBuf> {
        let path = self.output_file("title_rating_vs_revenue.png")?;

        let pairs: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|row| {
                let rating = row.rating?;
                let votes = row.numvotes?;
                let worldwide = row.worldwide_gross()? as f64;
                if !filters::votes_at_least(votes, self.votes_per_title_min)
                    || worldwide <= 0.0
                    || worldwide >= WORLDWIDE_GROSS_CAP
                {
                    return None;
                }
                Some((rating, worldwide / 1e6))
            })
            .collect();
        let intervals = aggregates::revenue_by_rating_interval(&pairs, &RATING_INTERVALS);

        let root = BitMapBackend::new(&path, (1000, 800)).into_drawing_area();
        root.fill(&WHITE)?;
        let areas = root.split_evenly((2, 1));
        draw_interval_panel(
            &areas[0],
            "Title Average Revenue by Rating Interval",
            &intervals,
            "Revenue ($mm)",
        )?;
        draw_scatter_panel(
            &areas[1],
            "Title Rating v Title Revenue",
            &pairs,
            "Title Rating",
            "Revenue ($mm)",
        )?;
        root.present()?;
        info!("Wrote chart {}", path.display());
        Ok(path.clone())
    }

    /// Title runtime against worldwide gross, in billions.
    pub fn runtime_vs_revenue(&self, rows: &[MergedTitle]) -> Result<PathBuf> {
        let path = self.output_file("runtime_vs_revenue.png")?;

        let points: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|row| {
                let runtime = row.runtime_minutes?;
                let worldwide = row.worldwide_gross()?;
                if worldwide == 0 {
                    return None;
                }
                Some((runtime as f64, worldwide as f64 / 1e9))
            })
            .collect();

        let root = BitMapBackend::new(&path, (800, 500)).into_drawing_area();
        root.fill(&WHITE)?;
        draw_scatter_panel(
            &root,
            "Title Runtime v Title Worldwide Revenue",
            &points,
            "runtime in minutes",
            "revenue ($bb)",
        )?;
        root.present()?;
        info!("Wrote chart {}", path.display());
        Ok(path.clone())
    }

    /// Title runtime against rating, for titles above the vote floor.
    pub fn runtime_vs_rating(&self, rows: &[MergedTitle]) -> Result<PathBuf> {
        let path = self.output_file("runtime_vs_rating.png")?;

        let points: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|row| {
                let runtime = row.runtime_minutes?;
                let rating = row.rating?;
                let votes = row.numvotes?;
                if !filters::votes_at_least(votes, self.votes_per_title_min) {
                    return None;
                }
                Some((runtime as f64, rating))
            })
            .collect();

        let root = BitMapBackend::new(&path, (800, 500)).into_drawing_area();
        root.fill(&WHITE)?;
        draw_scatter_panel(
            &root,
            "Title Runtime v Title Rating",
            &points,
            "runtime in minutes",
            "rating (1-10)",
        )?;
        root.present()?;
        info!("Wrote chart {}", path.display());
        Ok(path.clone())
    }
}

fn draw_bar_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    caption: Option<&str>,
    series_label: &str,
    entries: &[BarEntry],
    x_max: f64,
    x_desc: &str,
    color: &'static RGBColor,
) -> Result<()> {
    let n = entries.len().max(1);
    let mut builder = ChartBuilder::on(area);
    builder.margin(8).x_label_area_size(28).y_label_area_size(10);
    if let Some(caption) = caption {
        builder.caption(caption, ("sans-serif", 22));
    }
    let mut chart = builder.build_cartesian_2d(0f64..x_max, 0f64..n as f64)?;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_desc(x_desc)
        .draw()?;

    for (i, entry) in entries.iter().enumerate() {
        // Highest-ranked entry on top.
        let slot = (n - 1 - i) as f64;
        let series = chart.draw_series(std::iter::once(Rectangle::new(
            [(0.0, slot + 0.15), (entry.value, slot + 0.85)],
            color.mix(0.8).filled(),
        )))?;
        if i == 0 {
            series
                .label(series_label)
                .legend(move |(x, y)| Rectangle::new([(x, y - 4), (x + 12, y + 4)], color.filled()));
        }
        if let Some(error) = entry.error {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![((entry.value - error).max(0.0), slot + 0.5), (entry.value + error, slot + 0.5)],
                BLACK.stroke_width(1),
            )))?;
        }
        chart.draw_series(std::iter::once(Text::new(
            entry.name.clone(),
            (x_max * 0.01, slot + 0.8),
            ("sans-serif", 14).into_font().color(&BLACK),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            entry.label.clone(),
            (entry.value + x_max * 0.01, slot + 0.45),
            ("sans-serif", 13).into_font().color(&BLACK),
        )))?;
    }

    chart.configure_series_labels().border_style(BLACK).draw()?;
    Ok(())
}

fn draw_interval_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    caption: &str,
    intervals: &[IntervalStats],
    y_desc: &str,
) -> Result<()> {
    let x_min = intervals.first().map(|s| s.lower).unwrap_or(0.0);
    let x_max = intervals.last().map(|s| s.upper).unwrap_or(1.0);
    let y_max = intervals
        .iter()
        .map(|s| s.mean + s.stderr)
        .fold(1.0, f64::max)
        * 1.25;

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 22))
        .margin(8)
        .x_label_area_size(28)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;
    chart.configure_mesh().x_desc("rating").y_desc(y_desc).draw()?;

    for stats in intervals {
        if stats.title_count == 0 {
            continue;
        }
        let center = (stats.lower + stats.upper) / 2.0;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(center - 0.35, 0.0), (center + 0.35, stats.mean)],
            BLUE.mix(0.6).filled(),
        )))?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![
                (center, (stats.mean - stats.stderr).max(0.0)),
                (center, stats.mean + stats.stderr),
            ],
            BLACK.stroke_width(1),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            format!("{:.1}±{:.1}", stats.mean, stats.stderr),
            (center - 0.3, stats.mean + y_max * 0.04),
            ("sans-serif", 13).into_font().color(&BLACK),
        )))?;
    }
    Ok(())
}

fn draw_scatter_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    caption: &str,
    points: &[(f64, f64)],
    x_desc: &str,
    y_desc: &str,
) -> Result<()> {
    let x_max = points.iter().map(|(x, _)| *x).fold(1.0, f64::max) * 1.05;
    let y_max = points.iter().map(|(_, y)| *y).fold(1.0, f64::max) * 1.05;

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 22))
        .margin(8)
        .x_label_area_size(28)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)?;
    chart.configure_mesh().x_desc(x_desc).y_desc(y_desc).draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.mix(0.5).filled())),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(out_dir: PathBuf) -> ChartRenderer {
        ChartRenderer {
            out_dir,
            max_bars: 10,
            min_titles_per_genre: 1,
            votes_per_title_min: 100,
        }
    }

    #[test]
    fn test_bar_budget_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path().to_path_buf());
        let err = renderer.top_genres_by_revenue(&[], 11).unwrap_err();
        assert!(err.to_string().contains("upper bound"));
    }

    #[test]
    fn test_output_file_creates_chart_folder() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path().join("nested").join("charts"));
        let path = renderer.output_file("x.png").unwrap();
        assert!(path.parent().unwrap().is_dir());
        assert!(path.ends_with("x.png"));
    }
}
