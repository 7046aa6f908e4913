use serde::{Deserialize, Serialize};

/// One row of the merged title/rating/revenue dataset. Rating and revenue
/// columns come from left joins and may be absent for a given title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedTitle {
    pub tconst: String,
    pub title: String,
    pub year: Option<u32>,
    pub runtime_minutes: Option<u32>,
    pub genres: Option<String>,
    pub rating: Option<f64>,
    pub numvotes: Option<u64>,
    pub domestic_gross: Option<u64>,
    pub foreign_gross: Option<u64>,
}

impl MergedTitle {
    /// Domestic plus foreign gross, treating a single missing side as zero.
    /// `None` only when neither side reported a figure.
    pub fn worldwide_gross(&self) -> Option<u64> {
        match (self.domestic_gross, self.foreign_gross) {
            (None, None) => None,
            (domestic, foreign) => Some(domestic.unwrap_or(0) + foreign.unwrap_or(0)),
        }
    }
}

/// Per-genre revenue sum for one gross component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreRevenueTotal {
    pub genre: String,
    pub total_gross: u64,
    pub title_count: usize,
}

/// Per-genre revenue mean with dispersion, for one gross component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreRevenueMean {
    pub genre: String,
    pub mean: f64,
    pub stdev: f64,
    /// Standard error of the mean: stdev / sqrt(title_count).
    pub stderr: f64,
    pub title_count: usize,
}

/// Per-genre rating aggregates, weighted by vote counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreRatingStats {
    pub genre: String,
    pub weighted_rating: f64,
    pub weighted_stdev: f64,
    pub mean_rating: f64,
    pub rating_stdev: f64,
    pub total_votes: u64,
    pub title_count: usize,
}

/// Revenue mean and standard error over one (lower, upper] rating interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalStats {
    pub lower: f64,
    pub upper: f64,
    pub mean: f64,
    pub stderr: f64,
    pub title_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(domestic: Option<u64>, foreign: Option<u64>) -> MergedTitle {
        MergedTitle {
            tconst: "tt0000001".to_string(),
            title: "EXAMPLE".to_string(),
            year: Some(2015),
            runtime_minutes: Some(120),
            genres: Some("Drama".to_string()),
            rating: Some(7.2),
            numvotes: Some(5400),
            domestic_gross: domestic,
            foreign_gross: foreign,
        }
    }

    #[test]
    fn test_worldwide_gross_fills_missing_side_with_zero() {
        assert_eq!(title(Some(1_000_000), Some(250_000)).worldwide_gross(), Some(1_250_000));
        assert_eq!(title(Some(1_000_000), None).worldwide_gross(), Some(1_000_000));
        assert_eq!(title(None, Some(250_000)).worldwide_gross(), Some(250_000));
    }

    #[test]
    fn test_worldwide_gross_none_when_both_missing() {
        assert_eq!(title(None, None).worldwide_gross(), None);
    }
}
