use anyhow::Result;
use polars::prelude::*;

/// Row-filter predicates. Each is a pure test over one field; the cleaners
/// AND them together, so application order never changes the surviving set.
pub fn year_in_range(year: u32, min: u32, max: u32) -> bool {
    (min..=max).contains(&year)
}

pub fn runtime_in_range(runtime: u32, min: u32, max: u32) -> bool {
    (min..=max).contains(&runtime)
}

pub fn rating_in_range(rating: f64, min: f64, max: f64) -> bool {
    rating >= min && rating <= max
}

pub fn votes_at_least(votes: u64, min: u64) -> bool {
    votes >= min
}

/// Mask selecting rows where `keep` holds for the value of `column`.
/// Null cells never match.
pub fn column_mask(
    df: &DataFrame,
    column: &str,
    keep: impl Fn(f64) -> bool,
) -> Result<BooleanChunked> {
    let values = df.column(column)?.cast(&DataType::Float64)?;
    let values = values.f64()?;
    let mask: Vec<bool> = values.into_iter().map(|v| v.is_some_and(&keep)).collect();
    Ok(BooleanChunked::from_slice("mask".into(), &mask))
}

/// Mask selecting rows where every one of `columns` is non-null.
pub fn not_null_mask(df: &DataFrame, columns: &[&str]) -> Result<BooleanChunked> {
    let mut mask = vec![true; df.height()];
    for name in columns {
        let column = df.column(name)?;
        for (i, keep) in mask.iter_mut().enumerate() {
            if matches!(column.get(i)?, AnyValue::Null) {
                *keep = false;
            }
        }
    }
    Ok(BooleanChunked::from_slice("mask".into(), &mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates_are_inclusive_on_both_bounds() {
        assert!(year_in_range(2010, 2010, 2019));
        assert!(year_in_range(2019, 2010, 2019));
        assert!(!year_in_range(2009, 2010, 2019));
        assert!(!year_in_range(2020, 2010, 2019));

        assert!(runtime_in_range(25, 25, 360));
        assert!(!runtime_in_range(361, 25, 360));

        assert!(rating_in_range(1.0, 1.0, 10.0));
        assert!(rating_in_range(10.0, 1.0, 10.0));
        assert!(!rating_in_range(0.9, 1.0, 10.0));

        assert!(votes_at_least(100, 100));
        assert!(!votes_at_least(99, 100));
    }

    #[test]
    fn test_column_mask_excludes_nulls_and_rejected_values() {
        let df = df!(
            "year" => [Some(2009i64), Some(2012), None, Some(2019), Some(2020)]
        )
        .unwrap();
        let mask = column_mask(&df, "year", |y| year_in_range(y as u32, 2010, 2019)).unwrap();
        let kept: Vec<bool> = mask.into_no_null_iter().collect();
        assert_eq!(kept, vec![false, true, false, true, false]);
    }

    #[test]
    fn test_not_null_mask_requires_all_columns() {
        let df = df!(
            "a" => [Some("x"), None, Some("z")],
            "b" => [Some(1i64), Some(2), None]
        )
        .unwrap();
        let mask = not_null_mask(&df, &["a", "b"]).unwrap();
        let kept: Vec<bool> = mask.into_no_null_iter().collect();
        assert_eq!(kept, vec![true, false, false]);
    }
}
