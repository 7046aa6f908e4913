use anyhow::Result;
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::info;

use crate::config::PipelineConfig;
use crate::storage::CsvStore;

/// Year tie-break between the two revenue sources: the BOM value wins
/// whenever present, even when TN disagrees. The source system pins this
/// tie-break without stating a reason; it is preserved here as documented
/// behavior but may be an accidental default rather than a business rule.
pub fn reconcile_year(bom: Option<u32>, tn: Option<u32>) -> Option<u32> {
    match (bom, tn) {
        (Some(bom), Some(_)) => Some(bom),
        (Some(bom), None) => Some(bom),
        (None, tn) => tn,
    }
}

/// Gross reconciliation: the only reported value, or the larger of two;
/// smaller figures are treated as partial or stale reports.
pub fn reconcile_gross(bom: Option<u64>, tn: Option<u64>) -> Option<u64> {
    match (bom, tn) {
        (Some(bom), Some(tn)) => Some(bom.max(tn)),
        (Some(bom), None) => Some(bom),
        (None, tn) => tn,
    }
}

/// Combines the cleaned revenue sources and joins titles, ratings and
/// revenue into the final analysis dataset.
pub struct RevenueMerger;

impl RevenueMerger {
    /// Combine the two cleaned revenue files into one table keyed by
    /// upper-cased title, reconciling year and gross figures per title.
    pub fn combine_revenue_sources(&self, config: &PipelineConfig) -> Result<DataFrame> {
        let title_override = Schema::from_iter([Field::new("title".into(), DataType::String)]);
        let bom = CsvStore::load(
            &config.data_path(&config.files.bom_gross.clean),
            Some(title_override.clone()),
        )?;
        let tn = CsvStore::load(
            &config.data_path(&config.files.tn_budgets.clean),
            Some(title_override),
        )?;
        let combined = self.combine_frames(bom, tn)?;
        info!("Combined revenue sources: {} titles", combined.height());
        Ok(combined)
    }

    pub fn combine_frames(&self, bom: DataFrame, tn: DataFrame) -> Result<DataFrame> {
        let mut bom = upper_case_titles(bom)?;
        let mut tn = upper_case_titles(tn)?;

        // Sorted union of the titles seen by either source.
        let titles: BTreeSet<String> = {
            let bom_titles = bom.column("title")?.str()?;
            let tn_titles = tn.column("title")?.str()?;
            bom_titles
                .into_no_null_iter()
                .chain(tn_titles.into_no_null_iter())
                .map(|t| t.to_string())
                .collect()
        };
        let titles: Vec<String> = titles.into_iter().collect();
        let title_frame = DataFrame::new(vec![Column::new("title".into(), titles)])?;

        for column in ["year", "domestic_gross", "foreign_gross"] {
            bom.rename(column, format!("{column}_bom").into())?;
            tn.rename(column, format!("{column}_tn").into())?;
        }

        let joined = title_frame
            .lazy()
            .join(
                bom.lazy(),
                [col("title")],
                [col("title")],
                JoinArgs {
                    how: JoinType::Left,
                    maintain_order: MaintainOrderJoin::Left,
                    ..Default::default()
                },
            )
            .join(
                tn.lazy(),
                [col("title")],
                [col("title")],
                JoinArgs {
                    how: JoinType::Left,
                    maintain_order: MaintainOrderJoin::Left,
                    ..Default::default()
                },
            )
            .collect()?;

        let years = reconciled_u64(&joined, "year_bom", "year_tn", |b, t| {
            reconcile_year(b.map(|v| v as u32), t.map(|v| v as u32)).map(u64::from)
        })?;
        let domestic = reconciled_u64(&joined, "domestic_gross_bom", "domestic_gross_tn", |b, t| {
            reconcile_gross(b, t)
        })?;
        let foreign = reconciled_u64(&joined, "foreign_gross_bom", "foreign_gross_tn", |b, t| {
            reconcile_gross(b, t)
        })?;

        let titles = joined.column("title")?.clone();
        let mut combined = DataFrame::new(vec![
            titles,
            Column::new("year".into(), years),
            Column::new("domestic_gross".into(), domestic),
            Column::new("foreign_gross".into(), foreign),
        ])?;

        // A title with no resolvable year or gross on either side is dropped.
        let mask = crate::processor::filters::not_null_mask(
            &combined,
            &["year", "domestic_gross", "foreign_gross"],
        )?;
        combined = combined.filter(&mask)?;

        let year = combined.column("year")?.cast(&DataType::UInt32)?;
        combined.with_column(year)?;
        Ok(combined)
    }

    /// Build and write the merged title/rating/revenue dataset: titles LEFT
    /// JOIN ratings on `tconst`, then LEFT JOIN combined revenue on the
    /// upper-cased title.
    pub fn merge_all(&self, config: &PipelineConfig) -> Result<DataFrame> {
        let string_cols = Schema::from_iter([
            Field::new("tconst".into(), DataType::String),
            Field::new("title".into(), DataType::String),
            Field::new("genres".into(), DataType::String),
        ]);
        let titles = CsvStore::load(
            &config.data_path(&config.files.title_basics.clean),
            Some(string_cols.clone()),
        )?;
        let ratings = CsvStore::load(
            &config.data_path(&config.files.title_ratings.clean),
            Some(string_cols),
        )?;
        let revenue = self.combine_revenue_sources(config)?;

        let mut merged = self.merge_frames(titles, ratings, revenue)?;
        info!("Merged dataset: {} rows", merged.height());

        CsvStore::save(&mut merged, &config.merged_path())?;
        Ok(merged)
    }

    pub fn merge_frames(
        &self,
        titles: DataFrame,
        ratings: DataFrame,
        revenue: DataFrame,
    ) -> Result<DataFrame> {
        // The revenue year is redundant next to the title-basics year.
        let revenue = revenue.drop("year")?;
        let titles = upper_case_titles(titles)?;

        let merged = titles
            .lazy()
            .join(
                ratings.lazy(),
                [col("tconst")],
                [col("tconst")],
                JoinArgs {
                    how: JoinType::Left,
                    maintain_order: MaintainOrderJoin::Left,
                    ..Default::default()
                },
            )
            .join(
                revenue.lazy(),
                [col("title")],
                [col("title")],
                JoinArgs {
                    how: JoinType::Left,
                    maintain_order: MaintainOrderJoin::Left,
                    ..Default::default()
                },
            )
            .collect()?;

        Ok(merged.select([
            "tconst",
            "title",
            "year",
            "runtime_minutes",
            "genres",
            "rating",
            "numvotes",
            "domestic_gross",
            "foreign_gross",
        ])?)
    }
}

fn upper_case_titles(mut df: DataFrame) -> Result<DataFrame> {
    let upper: Vec<Option<String>> = {
        let titles = df.column("title")?.str()?;
        titles.into_iter().map(|t| t.map(|s| s.to_uppercase())).collect()
    };
    df.with_column(Series::new("title".into(), upper))?;
    Ok(df)
}

/// Zip two optional numeric columns through a reconciliation function.
fn reconciled_u64(
    df: &DataFrame,
    left: &str,
    right: &str,
    reconcile: impl Fn(Option<u64>, Option<u64>) -> Option<u64>,
) -> Result<Vec<Option<u64>>> {
    let left = df.column(left)?.cast(&DataType::Float64)?;
    let left = left.f64()?;
    let right = df.column(right)?.cast(&DataType::Float64)?;
    let right = right.f64()?;
    Ok(left
        .into_iter()
        .zip(right.into_iter())
        .map(|(l, r)| reconcile(l.map(|v| v as u64), r.map(|v| v as u64)))
        .collect())
}
