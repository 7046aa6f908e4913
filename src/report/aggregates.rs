use anyhow::Result;
use polars::prelude::*;
use std::collections::HashMap;

use crate::models::{
    GenreRatingStats, GenreRevenueMean, GenreRevenueTotal, IntervalStats, MergedTitle,
};
use crate::processor::filters;

/// Which side of the gross figures an aggregate ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrossComponent {
    Worldwide,
    Domestic,
    Foreign,
}

impl GrossComponent {
    pub fn label(&self) -> &'static str {
        match self {
            GrossComponent::Worldwide => "Worldwide",
            GrossComponent::Domestic => "Domestic",
            GrossComponent::Foreign => "Foreign",
        }
    }

    pub fn of(&self, title: &MergedTitle) -> Option<u64> {
        match self {
            GrossComponent::Worldwide => title.worldwide_gross(),
            GrossComponent::Domestic => title.domestic_gross,
            GrossComponent::Foreign => title.foreign_gross,
        }
    }
}

/// Pull the merged dataset into typed rows for aggregation.
pub fn extract_titles(df: &DataFrame) -> Result<Vec<MergedTitle>> {
    let tconst = df.column("tconst")?.str()?.clone();
    let title = df.column("title")?.str()?.clone();
    let genres = df.column("genres")?.str()?.clone();
    let year = df.column("year")?.cast(&DataType::Float64)?;
    let year = year.f64()?.clone();
    let runtime = df.column("runtime_minutes")?.cast(&DataType::Float64)?;
    let runtime = runtime.f64()?.clone();
    let rating = df.column("rating")?.cast(&DataType::Float64)?;
    let rating = rating.f64()?.clone();
    let numvotes = df.column("numvotes")?.cast(&DataType::Float64)?;
    let numvotes = numvotes.f64()?.clone();
    let domestic = df.column("domestic_gross")?.cast(&DataType::Float64)?;
    let domestic = domestic.f64()?.clone();
    let foreign = df.column("foreign_gross")?.cast(&DataType::Float64)?;
    let foreign = foreign.f64()?.clone();

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        rows.push(MergedTitle {
            tconst: tconst.get(i).unwrap_or_default().to_string(),
            title: title.get(i).unwrap_or_default().to_string(),
            year: year.get(i).map(|v| v as u32),
            runtime_minutes: runtime.get(i).map(|v| v as u32),
            genres: genres.get(i).map(|v| v.to_string()),
            rating: rating.get(i),
            numvotes: numvotes.get(i).map(|v| v as u64),
            domestic_gross: domestic.get(i).map(|v| v as u64),
            foreign_gross: foreign.get(i).map(|v| v as u64),
        });
    }
    Ok(rows)
}

/// Per-genre revenue sums for one gross component, descending by total.
pub fn genre_revenue_totals(rows: &[MergedTitle], component: GrossComponent) -> Vec<GenreRevenueTotal> {
    let mut by_genre: HashMap<&str, (u64, usize)> = HashMap::new();
    for row in rows {
        let (Some(genre), Some(gross)) = (row.genres.as_deref(), component.of(row)) else {
            continue;
        };
        let entry = by_genre.entry(genre).or_default();
        entry.0 += gross;
        entry.1 += 1;
    }
    let mut totals: Vec<GenreRevenueTotal> = by_genre
        .into_iter()
        .map(|(genre, (total_gross, title_count))| GenreRevenueTotal {
            genre: genre.to_string(),
            total_gross,
            title_count,
        })
        .collect();
    totals.sort_by(|a, b| b.total_gross.cmp(&a.total_gross).then(a.genre.cmp(&b.genre)));
    totals
}

/// Per-genre revenue mean/stdev/stderr for one gross component, descending by
/// mean. Genres with fewer than `min_titles` entries are excluded.
pub fn genre_revenue_means(
    rows: &[MergedTitle],
    component: GrossComponent,
    min_titles: usize,
) -> Vec<GenreRevenueMean> {
    let mut by_genre: HashMap<&str, Vec<f64>> = HashMap::new();
    for row in rows {
        let (Some(genre), Some(gross)) = (row.genres.as_deref(), component.of(row)) else {
            continue;
        };
        by_genre.entry(genre).or_default().push(gross as f64);
    }
    let mut means: Vec<GenreRevenueMean> = by_genre
        .into_iter()
        .filter(|(_, values)| values.len() >= min_titles)
        .map(|(genre, values)| {
            let (mean, stdev) = mean_and_sample_stdev(&values);
            GenreRevenueMean {
                genre: genre.to_string(),
                mean,
                stdev,
                stderr: stdev / (values.len() as f64).sqrt(),
                title_count: values.len(),
            }
        })
        .collect();
    means.sort_by(|a, b| b.mean.total_cmp(&a.mean).then(a.genre.cmp(&b.genre)));
    means
}

/// Per-genre rating aggregates over titles with at least `votes_min` votes,
/// descending by vote-weighted rating. Genres with fewer than `min_titles`
/// surviving titles are excluded.
pub fn genre_rating_stats(
    rows: &[MergedTitle],
    votes_min: u64,
    min_titles: usize,
) -> Vec<GenreRatingStats> {
    let mut by_genre: HashMap<&str, Vec<(f64, u64)>> = HashMap::new();
    for row in rows {
        let (Some(genre), Some(rating), Some(votes)) =
            (row.genres.as_deref(), row.rating, row.numvotes)
        else {
            continue;
        };
        if !filters::votes_at_least(votes, votes_min) {
            continue;
        }
        by_genre.entry(genre).or_default().push((rating, votes));
    }

    let mut stats: Vec<GenreRatingStats> = by_genre
        .into_iter()
        .filter(|(_, pairs)| pairs.len() >= min_titles)
        .map(|(genre, pairs)| {
            let ratings: Vec<f64> = pairs.iter().map(|(r, _)| *r).collect();
            let (mean_rating, rating_stdev) = mean_and_sample_stdev(&ratings);
            let (weighted_rating, weighted_stdev) = weighted_mean_and_stdev(&pairs);
            GenreRatingStats {
                genre: genre.to_string(),
                weighted_rating,
                weighted_stdev,
                mean_rating,
                rating_stdev,
                total_votes: pairs.iter().map(|(_, v)| *v).sum(),
                title_count: pairs.len(),
            }
        })
        .collect();
    stats.sort_by(|a, b| b.weighted_rating.total_cmp(&a.weighted_rating).then(a.genre.cmp(&b.genre)));
    stats
}

/// Revenue mean and standard error over (lower, upper] rating intervals.
/// `pairs` holds (rating, revenue); revenue is pre-scaled by the caller.
pub fn revenue_by_rating_interval(pairs: &[(f64, f64)], intervals: &[(f64, f64)]) -> Vec<IntervalStats> {
    intervals
        .iter()
        .map(|&(lower, upper)| {
            let bucket: Vec<f64> = pairs
                .iter()
                .filter(|(rating, _)| *rating > lower && *rating <= upper)
                .map(|(_, revenue)| *revenue)
                .collect();
            if bucket.is_empty() {
                return IntervalStats { lower, upper, mean: 0.0, stderr: 0.0, title_count: 0 };
            }
            let (mean, stdev) = mean_and_sample_stdev(&bucket);
            IntervalStats {
                lower,
                upper,
                mean,
                stderr: stdev / (bucket.len() as f64).sqrt(),
                title_count: bucket.len(),
            }
        })
        .collect()
}

/// Union of the best genres by weighted rating and by plain mean rating,
/// capped at `max` entries from each ranking.
pub fn top_genre_names(stats: &[GenreRatingStats], max: usize) -> Vec<String> {
    let mut by_mean: Vec<&GenreRatingStats> = stats.iter().collect();
    by_mean.sort_by(|a, b| b.mean_rating.total_cmp(&a.mean_rating).then(a.genre.cmp(&b.genre)));

    let mut names: Vec<String> = Vec::new();
    for entry in stats.iter().take(max).chain(by_mean.into_iter().take(max)) {
        if !names.contains(&entry.genre) {
            names.push(entry.genre.clone());
        }
    }
    names
}

/// Mean and sample standard deviation (n - 1 denominator; 0 for n < 2).
fn mean_and_sample_stdev(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

/// Vote-weighted mean and standard deviation:
/// mean = Σ(r·w)/Σw, stdev = sqrt(Σ(r²·w)/Σw − mean²).
fn weighted_mean_and_stdev(pairs: &[(f64, u64)]) -> (f64, f64) {
    let total_weight: f64 = pairs.iter().map(|(_, w)| *w as f64).sum();
    if total_weight == 0.0 {
        return (0.0, 0.0);
    }
    let weighted_sum: f64 = pairs.iter().map(|(r, w)| r * *w as f64).sum();
    let weighted_square_sum: f64 = pairs.iter().map(|(r, w)| r * r * *w as f64).sum();
    let mean = weighted_sum / total_weight;
    let variance = (weighted_square_sum / total_weight - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(genre: &str, rating: f64, votes: u64, domestic: u64, foreign: u64) -> MergedTitle {
        MergedTitle {
            tconst: "tt".to_string(),
            title: "T".to_string(),
            year: Some(2015),
            runtime_minutes: Some(100),
            genres: Some(genre.to_string()),
            rating: Some(rating),
            numvotes: Some(votes),
            domestic_gross: Some(domestic),
            foreign_gross: Some(foreign),
        }
    }

    #[test]
    fn test_genre_revenue_totals_ranks_descending() {
        let rows = vec![
            row("Drama", 7.0, 1000, 100, 50),
            row("Drama", 6.0, 1000, 200, 0),
            row("Action", 5.0, 1000, 1000, 1000),
        ];
        let totals = genre_revenue_totals(&rows, GrossComponent::Worldwide);
        assert_eq!(totals[0].genre, "Action");
        assert_eq!(totals[0].total_gross, 2000);
        assert_eq!(totals[1].genre, "Drama");
        assert_eq!(totals[1].total_gross, 350);
        assert_eq!(totals[1].title_count, 2);
    }

    #[test]
    fn test_genre_revenue_totals_skips_rows_without_figures() {
        let mut missing = row("Drama", 7.0, 1000, 0, 0);
        missing.domestic_gross = None;
        missing.foreign_gross = None;
        let totals = genre_revenue_totals(&[missing], GrossComponent::Worldwide);
        assert!(totals.is_empty());
    }

    #[test]
    fn test_genre_revenue_means_applies_group_floor() {
        let rows = vec![
            row("Drama", 7.0, 1000, 100, 0),
            row("Drama", 6.0, 1000, 300, 0),
            row("Action", 5.0, 1000, 1000, 0),
        ];
        let means = genre_revenue_means(&rows, GrossComponent::Domestic, 2);
        assert_eq!(means.len(), 1);
        assert_eq!(means[0].genre, "Drama");
        assert!((means[0].mean - 200.0).abs() < 1e-9);
        // Sample stdev of {100, 300} is sqrt(20000).
        assert!((means[0].stdev - 20000f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_genre_rating_stats_weighted_by_votes() {
        let rows = vec![
            row("Drama", 8.0, 3000, 0, 0),
            row("Drama", 4.0, 1000, 0, 0),
            row("Drama", 9.0, 500, 0, 0), // below the vote floor
        ];
        let stats = genre_rating_stats(&rows, 1000, 1);
        assert_eq!(stats.len(), 1);
        let drama = &stats[0];
        // (8*3000 + 4*1000) / 4000 = 7.0
        assert!((drama.weighted_rating - 7.0).abs() < 1e-9);
        // sqrt((64*3000 + 16*1000)/4000 - 49) = sqrt(3)
        assert!((drama.weighted_stdev - 3f64.sqrt()).abs() < 1e-9);
        assert_eq!(drama.total_votes, 4000);
        assert_eq!(drama.title_count, 2);
    }

    #[test]
    fn test_revenue_by_rating_interval_half_open_buckets() {
        let pairs = vec![(2.0, 10.0), (2.5, 20.0), (3.0, 30.0), (3.5, 40.0)];
        let stats = revenue_by_rating_interval(&pairs, &[(1.0, 2.0), (2.0, 3.0), (3.0, 4.0)]);
        // 2.0 belongs to (1, 2], not (2, 3].
        assert_eq!(stats[0].title_count, 1);
        assert!((stats[0].mean - 10.0).abs() < 1e-9);
        assert_eq!(stats[1].title_count, 2);
        assert!((stats[1].mean - 25.0).abs() < 1e-9);
        assert_eq!(stats[2].title_count, 1);
    }

    #[test]
    fn test_top_genre_names_unions_both_rankings() {
        let rows = vec![
            row("Drama", 8.0, 4000, 0, 0),
            row("Drama", 2.0, 100_000, 0, 0),
            row("Action", 7.0, 1000, 0, 0),
        ];
        // Action leads the plain-mean ranking; Drama's huge low-rated vote
        // pool drags its weighted rating below Action's as well.
        let stats = genre_rating_stats(&rows, 100, 1);
        let names = top_genre_names(&stats, 1);
        assert!(names.contains(&"Action".to_string()));
        assert_eq!(names.len(), names.iter().collect::<std::collections::HashSet<_>>().len());
    }
}
