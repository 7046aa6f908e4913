use anyhow::{Context, Result, bail};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Flat-file CSV access for every pipeline stage: comma-separated, UTF-8,
/// double-quote enclosure, header row.
pub struct CsvStore;

impl CsvStore {
    /// Read a CSV file into a DataFrame. `schema_overrides` forces dtypes by
    /// column name where inference would guess wrong (string-typed revenue
    /// columns, float-typed years with trailing ".0").
    pub fn load(path: &Path, schema_overrides: Option<Schema>) -> Result<DataFrame> {
        if !path.exists() {
            bail!("Input file not found: {}", path.display());
        }
        let mut options = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')));
        if let Some(schema) = schema_overrides {
            options = options.with_schema_overwrite(Some(Arc::new(schema)));
        }
        options
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("Failed to open CSV file {}", path.display()))?
            .finish()
            .with_context(|| format!("Failed to read CSV file {}", path.display()))
    }

    /// Write a DataFrame as CSV, creating the parent folder when needed.
    pub fn save(df: &mut DataFrame, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create folder {}", parent.display()))?;
        }
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        CsvWriter::new(&mut file)
            .finish(df)
            .with_context(|| format!("Failed to write CSV file {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("titles.csv");

        let mut df = df!(
            "title" => ["Avatar", "A, Movie with \"Quotes\""],
            "year" => [2009i64, 2015]
        )
        .unwrap();
        CsvStore::save(&mut df, &path).unwrap();

        let loaded = CsvStore::load(&path, None).unwrap();
        assert_eq!(loaded.height(), 2);
        let titles = loaded.column("title").unwrap();
        let titles = titles.str().unwrap();
        assert_eq!(titles.get(1), Some("A, Movie with \"Quotes\""));
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvStore::load(&dir.path().join("absent.csv"), None).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_schema_override_keeps_strings_unparsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gross.csv");
        std::fs::write(&path, "title,foreign_gross\nAvatar,2021\n").unwrap();

        let schema = Schema::from_iter([Field::new("foreign_gross".into(), DataType::String)]);
        let df = CsvStore::load(&path, Some(schema)).unwrap();
        assert_eq!(df.column("foreign_gross").unwrap().dtype(), &DataType::String);
    }
}
