use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use tracing::info;

use crate::config::{FilterSection, PipelineConfig};
use crate::processor::filters;
use crate::processor::revenue_parser::{BomGrossParser, GrossValueParser, TnGrossParser};
use crate::storage::CsvStore;

/// Normalize one gross column to whole dollars. String columns go through the
/// source parser's string rules; anything else is read as float and handled
/// by the numeric branch. `None` entries mark unparseable cells.
fn normalized_gross(
    df: &DataFrame,
    column: &str,
    parser: &dyn GrossValueParser,
) -> Result<Vec<Option<u64>>> {
    let column = df.column(column)?;
    match column.dtype() {
        DataType::String => {
            let values = column.str()?;
            Ok(values.into_iter().map(|v| parser.parse(v)).collect())
        }
        _ => {
            let values = column.cast(&DataType::Float64)?;
            let values = values.f64()?;
            Ok(values.into_iter().map(|v| parser.parse_numeric(v)).collect())
        }
    }
}

/// Release year of a "Dec 18, 2009"-style date. Falls back to the trailing
/// four characters for already-bare years.
fn release_year(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%b %d, %Y") {
        return u32::try_from(date.year()).ok();
    }
    if trimmed.len() >= 4 {
        trimmed[trimmed.len() - 4..].parse().ok()
    } else {
        None
    }
}

/// Cleaner for the Box Office Mojo gross export (`title, studio,
/// domestic_gross, foreign_gross, year`). Drops the studio column, normalizes
/// both gross columns and removes rows either parser rejects.
pub struct BomGrossCleaner {
    parser: BomGrossParser,
}

impl BomGrossCleaner {
    pub fn new() -> Self {
        BomGrossCleaner { parser: BomGrossParser::new() }
    }

    pub fn clean(&self, config: &PipelineConfig) -> Result<DataFrame> {
        let raw_path = config.data_path(&config.files.bom_gross.raw);
        let schema = Schema::from_iter([
            Field::new("title".into(), DataType::String),
            Field::new("studio".into(), DataType::String),
            Field::new("domestic_gross".into(), DataType::Float64),
            Field::new("foreign_gross".into(), DataType::String),
            Field::new("year".into(), DataType::Float64),
        ]);
        let df = CsvStore::load(&raw_path, Some(schema))?;
        let raw_rows = df.height();

        let mut df = self.clean_frame(df, &config.filters)?;
        info!("BOM movie gross: kept {} of {} rows", df.height(), raw_rows);

        CsvStore::save(&mut df, &config.data_path(&config.files.bom_gross.clean))?;
        Ok(df)
    }

    pub fn clean_frame(&self, df: DataFrame, bounds: &FilterSection) -> Result<DataFrame> {
        let df = df.drop("studio")?;

        let mask = filters::not_null_mask(&df, &["title", "year"])?;
        let df = df.filter(&mask)?;

        let mask = filters::column_mask(&df, "year", |year| {
            filters::year_in_range(year as u32, bounds.year_min, bounds.year_max)
        })?;
        let mut df = df.filter(&mask)?;

        let domestic = normalized_gross(&df, "domestic_gross", &self.parser)?;
        let foreign = normalized_gross(&df, "foreign_gross", &self.parser)?;
        df.with_column(Series::new("domestic_gross".into(), domestic))?;
        df.with_column(Series::new("foreign_gross".into(), foreign))?;

        let mask = filters::not_null_mask(&df, &["domestic_gross", "foreign_gross"])?;
        let mut df = df.filter(&mask)?;

        let year = df.column("year")?.cast(&DataType::UInt32)?;
        df.with_column(year)?;

        Ok(df.select(["title", "year", "domestic_gross", "foreign_gross"])?)
    }
}

/// Cleaner for The Numbers budgets export (`id, release_date, movie,
/// production_budget, domestic_gross, worldwide_gross`). Derives the release
/// year, normalizes both revenue columns and replaces the worldwide figure
/// with the implied foreign gross.
pub struct TnBudgetsCleaner {
    parser: TnGrossParser,
}

impl TnBudgetsCleaner {
    pub fn new() -> Self {
        TnBudgetsCleaner { parser: TnGrossParser::new() }
    }

    pub fn clean(&self, config: &PipelineConfig) -> Result<DataFrame> {
        let raw_path = config.data_path(&config.files.tn_budgets.raw);
        let schema = Schema::from_iter([
            Field::new("release_date".into(), DataType::String),
            Field::new("movie".into(), DataType::String),
            Field::new("production_budget".into(), DataType::String),
            Field::new("domestic_gross".into(), DataType::String),
            Field::new("worldwide_gross".into(), DataType::String),
        ]);
        let df = CsvStore::load(&raw_path, Some(schema))?;
        let raw_rows = df.height();

        let mut df = self.clean_frame(df, &config.filters)?;
        info!("TN budget gross: kept {} of {} rows", df.height(), raw_rows);

        CsvStore::save(&mut df, &config.data_path(&config.files.tn_budgets.clean))?;
        Ok(df)
    }

    pub fn clean_frame(&self, df: DataFrame, bounds: &FilterSection) -> Result<DataFrame> {
        let mut df = df.drop("id")?.drop("production_budget")?;
        df.rename("movie", "title".into())?;

        let years: Vec<Option<u32>> = {
            let dates = df.column("release_date")?.str()?;
            dates.into_iter().map(|d| d.and_then(release_year)).collect()
        };
        df.with_column(Series::new("year".into(), years))?;
        let df = df.drop("release_date")?;

        let mask = filters::not_null_mask(&df, &["title", "year"])?;
        let df = df.filter(&mask)?;

        let mask = filters::column_mask(&df, "year", |year| {
            filters::year_in_range(year as u32, bounds.year_min, bounds.year_max)
        })?;
        let mut df = df.filter(&mask)?;

        let domestic = normalized_gross(&df, "domestic_gross", &self.parser)?;
        let worldwide = normalized_gross(&df, "worldwide_gross", &self.parser)?;
        df.with_column(Series::new("domestic_gross".into(), domestic))?;
        df.with_column(Series::new("worldwide_gross".into(), worldwide))?;

        let mask = filters::not_null_mask(&df, &["domestic_gross", "worldwide_gross"])?;
        let mut df = df.filter(&mask)?;

        // Worldwide covers domestic; the difference is the foreign share.
        let foreign: Vec<u64> = {
            let domestic = df.column("domestic_gross")?.u64()?;
            let worldwide = df.column("worldwide_gross")?.u64()?;
            domestic
                .into_no_null_iter()
                .zip(worldwide.into_no_null_iter())
                .map(|(d, w)| w.saturating_sub(d))
                .collect()
        };
        df.with_column(Series::new("foreign_gross".into(), foreign))?;

        let year = df.column("year")?.cast(&DataType::UInt32)?;
        df.with_column(year)?;

        Ok(df.select(["title", "year", "domestic_gross", "foreign_gross"])?)
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
    fn test_release_year_formats() {
        assert_eq!(release_year("Dec 18, 2009"), Some(2009));
        assert_eq!(release_year("Jun 7, 2019"), Some(2019));
        assert_eq!(release_year("2015"), Some(2015));
        assert_eq!(release_year("n/a"), None);
    }

    #[test]
    fn test_bom_clean_frame_drops_unparseable_gross() {
        let df = df!(
            "title" => [Some("Kept"), Some("Bad Foreign"), Some("Old"), None],
            "studio" => [Some("Fox"), Some("WB"), Some("BV"), Some("Uni.")],
            "domestic_gross" => [Some(700_000_000.0), Some(1_000_000.0), Some(2_000_000.0), Some(3_000_000.0)],
            "foreign_gross" => [Some("1,131.6"), Some("12,34"), Some(""), Some("5")],
            "year" => [Some(2015.0), Some(2015.0), Some(2008.0), Some(2015.0)]
        )
        .unwrap();

        let clean = BomGrossCleaner::new().clean_frame(df, &test_filters()).unwrap();
        assert_eq!(
            clean.get_column_names_str(),
            vec!["title", "year", "domestic_gross", "foreign_gross"]
        );
        assert_eq!(clean.height(), 1);
        let foreign = clean.column("foreign_gross").unwrap();
        assert_eq!(foreign.u64().unwrap().get(0), Some(1_131_600_000));
    }

    #[test]
    fn test_bom_missing_foreign_cell_becomes_zero() {
        let df = df!(
            "title" => ["Domestic Only"],
            "studio" => ["Fox"],
            "domestic_gross" => [53_900.0],
            "foreign_gross" => [None::<&str>],
            "year" => [2014.0]
        )
        .unwrap();

        let clean = BomGrossCleaner::new().clean_frame(df, &test_filters()).unwrap();
        assert_eq!(clean.height(), 1);
        let foreign = clean.column("foreign_gross").unwrap();
        assert_eq!(foreign.u64().unwrap().get(0), Some(0));
    }

    #[test]
    fn test_tn_clean_frame_derives_year_and_foreign_share() {
        let df = df!(
            "id" => [1i64, 2, 3],
            "release_date" => ["Dec 18, 2015", "Dec 18, 2009", "Jun 7, 2017"],
            "movie" => ["Star Wars Ep. VII: The Force Awakens", "Avatar", "Broken"],
            "production_budget" => ["$306,000,000", "$425,000,000", "$1,000"],
            "domestic_gross" => ["$936,662,225", "$760,507,625", "$12-34"],
            "worldwide_gross" => ["$2,053,311,220", "$2,776,345,279", "$99,999"]
        )
        .unwrap();

        let clean = TnBudgetsCleaner::new().clean_frame(df, &test_filters()).unwrap();
        assert_eq!(
            clean.get_column_names_str(),
            vec!["title", "year", "domestic_gross", "foreign_gross"]
        );
        // Avatar predates the window; "Broken" has an unparseable domestic figure.
        assert_eq!(clean.height(), 1);
        let year = clean.column("year").unwrap();
        assert_eq!(year.u32().unwrap().get(0), Some(2015));
        let domestic = clean.column("domestic_gross").unwrap();
        assert_eq!(domestic.u64().unwrap().get(0), Some(936_662_225));
        let foreign = clean.column("foreign_gross").unwrap();
        assert_eq!(foreign.u64().unwrap().get(0), Some(2_053_311_220 - 936_662_225));
    }

    #[test]
    fn test_tn_foreign_share_saturates_at_zero() {
        let df = df!(
            "id" => [1i64],
            "release_date" => ["Jan 1, 2016"],
            "movie" => ["Stale Worldwide"],
            "production_budget" => ["$10"],
            "domestic_gross" => ["2,000,000"],
            "worldwide_gross" => ["1,500,000"]
        )
        .unwrap();

        let clean = TnBudgetsCleaner::new().clean_frame(df, &test_filters()).unwrap();
        let foreign = clean.column("foreign_gross").unwrap();
        assert_eq!(foreign.u64().unwrap().get(0), Some(0));
    }
}
