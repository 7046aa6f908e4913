use anyhow::Result;
use polars::prelude::*;
use tracing::info;

use crate::config::{FilterSection, PipelineConfig};
use crate::processor::filters;
use crate::storage::CsvStore;

/// Cleaner for the IMDB title-basics export.
///
/// Raw columns: `tconst, primary_title, original_title, start_year,
/// runtime_minutes, genres`. Keeps titles with complete fields, a release
/// year inside the configured window and a plausible runtime, and writes the
/// result with standardized column names.
pub struct TitleBasicsCleaner;

impl TitleBasicsCleaner {
    pub fn clean(&self, config: &PipelineConfig) -> Result<DataFrame> {
        let raw_path = config.data_path(&config.files.title_basics.raw);
        let schema = Schema::from_iter([
            Field::new("tconst".into(), DataType::String),
            Field::new("primary_title".into(), DataType::String),
            Field::new("original_title".into(), DataType::String),
            Field::new("start_year".into(), DataType::Float64),
            Field::new("runtime_minutes".into(), DataType::Float64),
            Field::new("genres".into(), DataType::String),
        ]);
        let df = CsvStore::load(&raw_path, Some(schema))?;
        let raw_rows = df.height();

        let mut df = self.clean_frame(df, &config.filters)?;
        info!("Title basics: kept {} of {} rows", df.height(), raw_rows);

        CsvStore::save(&mut df, &config.data_path(&config.files.title_basics.clean))?;
        Ok(df)
    }

    pub fn clean_frame(&self, df: DataFrame, bounds: &FilterSection) -> Result<DataFrame> {
        let mut df = df.drop("original_title")?;
        df.rename("primary_title", "title".into())?;
        df.rename("start_year", "year".into())?;

        let mask =
            filters::not_null_mask(&df, &["tconst", "title", "year", "runtime_minutes", "genres"])?;
        let df = df.filter(&mask)?;

        let mask = filters::column_mask(&df, "year", |year| {
            filters::year_in_range(year as u32, bounds.year_min, bounds.year_max)
        })?;
        let df = df.filter(&mask)?;

        let mask = filters::column_mask(&df, "runtime_minutes", |runtime| {
            filters::runtime_in_range(runtime as u32, bounds.runtime_min, bounds.runtime_max)
        })?;
        let mut df = df.filter(&mask)?;

        let year = df.column("year")?.cast(&DataType::UInt32)?;
        let runtime = df.column("runtime_minutes")?.cast(&DataType::UInt32)?;
        df.with_column(year)?;
        df.with_column(runtime)?;

        Ok(df.select(["tconst", "title", "year", "runtime_minutes", "genres"])?)
    }
}
