use anyhow::Result;
use polars::prelude::*;
use tracing::info;

use crate::config::{FilterSection, PipelineConfig};
use crate::processor::filters;
use crate::storage::CsvStore;

/// Cleaner for the IMDB title-ratings export (`tconst, averagerating,
/// numvotes`). Ratings outside the configured band and sparsely-voted titles
/// are removed; `averagerating` is renamed to `rating`.
pub struct RatingsCleaner;

impl RatingsCleaner {
    pub fn clean(&self, config: &PipelineConfig) -> Result<DataFrame> {
        let raw_path = config.data_path(&config.files.title_ratings.raw);
        let schema = Schema::from_iter([
            Field::new("tconst".into(), DataType::String),
            Field::new("averagerating".into(), DataType::Float64),
            Field::new("numvotes".into(), DataType::Float64),
        ]);
        let df = CsvStore::load(&raw_path, Some(schema))?;
        let raw_rows = df.height();

        let mut df = self.clean_frame(df, &config.filters)?;
        info!("Title ratings: kept {} of {} rows", df.height(), raw_rows);

        CsvStore::save(&mut df, &config.data_path(&config.files.title_ratings.clean))?;
        Ok(df)
    }

    pub fn clean_frame(&self, df: DataFrame, bounds: &FilterSection) -> Result<DataFrame> {
        let mask = filters::not_null_mask(&df, &["tconst", "averagerating", "numvotes"])?;
        let df = df.filter(&mask)?;

        let mask = filters::column_mask(&df, "averagerating", |rating| {
            filters::rating_in_range(rating, bounds.rating_min, bounds.rating_max)
        })?;
        let df = df.filter(&mask)?;

        let mask = filters::column_mask(&df, "numvotes", |votes| {
            filters::votes_at_least(votes as u64, bounds.votes_min)
        })?;
        let mut df = df.filter(&mask)?;

        df.rename("averagerating", "rating".into())?;
        let votes = df.column("numvotes")?.cast(&DataType::UInt64)?;
        df.with_column(votes)?;

        Ok(df.select(["tconst", "rating", "numvotes"])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_filters() -> FilterSection {
        FilterSection {
            year_min: 2010,
            year_max: 2019,
            runtime_min: 25,
            runtime_max: 360,
            rating_min: 1.0,
            rating_max: 10.0,
            votes_min: 100,
            votes_per_title_min: 1000,
        }
    }

    #[test]
    fn test_clean_frame_applies_rating_and_vote_thresholds() {
        let df = df!(
            "tconst" => [Some("tt1"), Some("tt2"), Some("tt3"), Some("tt4"), None],
            "averagerating" => [Some(7.5), Some(0.5), Some(9.9), Some(6.0), Some(5.0)],
            "numvotes" => [Some(100.0), Some(5000.0), Some(99.0), Some(250.0), Some(400.0)]
        )
        .unwrap();

        let clean = RatingsCleaner.clean_frame(df, &test_filters()).unwrap();
        assert_eq!(clean.get_column_names_str(), vec!["tconst", "rating", "numvotes"]);

        let ids = clean.column("tconst").unwrap();
        let ids: Vec<&str> = ids.str().unwrap().into_no_null_iter().collect();
        // tt2 fails the rating band, tt3 the vote floor, row 5 the null filter.
        assert_eq!(ids, vec!["tt1", "tt4"]);
        assert_eq!(clean.column("numvotes").unwrap().dtype(), &DataType::UInt64);
    }
}
