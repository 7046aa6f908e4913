use regex::Regex;
use tracing::warn;

/// Common contract of the source-specific gross-revenue normalizers.
///
/// `None` means unparseable; callers propagate it as a missing value and the
/// row is dropped by the cleaning step. Malformed data never raises.
pub trait GrossValueParser {
    /// Normalize a raw string cell to whole dollars.
    fn parse(&self, raw: Option<&str>) -> Option<u64>;
    /// Normalize a numeric cell to whole dollars.
    fn parse_numeric(&self, value: Option<f64>) -> Option<u64>;
}

/// Missing and NaN numeric cells mean "no figure reported" and normalize to
/// zero; negative or non-finite figures are unparseable.
fn numeric_to_dollars(value: Option<f64>) -> Option<u64> {
    match value {
        None => Some(0),
        Some(v) if v.is_nan() => Some(0),
        Some(v) if !v.is_finite() || v < 0.0 => None,
        Some(v) => Some(v as u64),
    }
}

/// Conversion failures on structurally-accepted tokens are unexpected;
/// they are logged and mapped to the missing-value sentinel, never raised.
fn parse_digits(digits: &str) -> Option<u64> {
    match digits.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Cannot convert value {digits:?} to a dollar amount");
            None
        }
    }
}

fn float_truncate(body: &str) -> Option<u64> {
    match body.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value as u64),
        _ => {
            warn!("Cannot convert value {body:?} to a float dollar amount");
            None
        }
    }
}

/// Normalizer for The Numbers budget exports, where gross figures come as
/// dollar-sign-prefixed, comma-grouped strings like `$425,000,000`.
///
/// String tokens are classified by a fixed-priority rule list; the first rule
/// that matches decides the value. Each rule is independent of the others.
pub struct TnGrossParser {
    allowed: Regex,
    digits: Regex,
    grouped: Regex,
}

impl TnGrossParser {
    pub fn new() -> Self {
        TnGrossParser {
            allowed: Regex::new(r"^\$?[0-9,.]*$").unwrap(),
            digits: Regex::new(r"^\d+$").unwrap(),
            grouped: Regex::new(r"^\d{1,3}(?:,\d{3})*$").unwrap(),
        }
    }

    fn parse_str(&self, s: &str) -> Option<u64> {
        // Rule 1: any character outside {digits, ',', '.', leading '$'}.
        if !self.allowed.is_match(s) {
            return None;
        }
        // Rule 2: an empty cell means no release in that market.
        if s.is_empty() {
            return Some(0);
        }
        // Rule 3: literal "$0".
        if s == "$0" {
            return Some(0);
        }
        // Rule 4: '$' followed by at most three characters; they must all be
        // digits ("$1.2" is rejected here, not reconsidered later).
        if s.starts_with('$') && s.len() <= 4 {
            let body = &s[1..];
            return if !body.is_empty() && self.digits.is_match(body) {
                parse_digits(body)
            } else {
                None
            };
        }
        // Rule 5: more than one decimal point.
        if s.matches('.').count() > 1 {
            return None;
        }
        // Rule 6: pure digit string.
        if self.digits.is_match(s) {
            return parse_digits(s);
        }
        let has_dollar = s.starts_with('$');
        let body = if has_dollar { &s[1..] } else { s };
        let has_comma = body.contains(',');
        let has_point = body.contains('.');
        match (has_dollar, has_comma, has_point) {
            // Rule 7: plain decimal like "1235356.343", truncated.
            (false, false, true) => float_truncate(body),
            // Rule 8: comma-grouped integer, optionally '$'-prefixed.
            (_, true, false) => self.comma_grouped(body),
            // Rule 9: comma-grouped integer part with one trailing fraction.
            (_, true, true) => self.comma_grouped_with_fraction(body),
            // Anything else ("$1234.5", "$12345", ...) is unparseable.
            _ => None,
        }
    }

    /// Strict thousands grouping: first group of 1-3 digits, every further
    /// group exactly 3. "12,34,567" and ",123" fail here.
    fn comma_grouped(&self, body: &str) -> Option<u64> {
        if !self.grouped.is_match(body) {
            return None;
        }
        parse_digits(&body.replace(',', ""))
    }

    /// "1,234,000.0" style: the fraction must not itself contain a comma and
    /// is discarded; the integer part follows the grouping rule.
    fn comma_grouped_with_fraction(&self, body: &str) -> Option<u64> {
        let (int_part, fraction) = body.split_once('.')?;
        if fraction.contains(',') {
            return None;
        }
        self.comma_grouped(int_part)
    }
}

impl GrossValueParser for TnGrossParser {
    fn parse(&self, raw: Option<&str>) -> Option<u64> {
        match raw {
            None => Some(0),
            Some(s) => self.parse_str(s),
        }
    }

    fn parse_numeric(&self, value: Option<f64>) -> Option<u64> {
        numeric_to_dollars(value)
    }
}

/// Normalizer for Box Office Mojo gross exports. Foreign gross arrives either
/// as a numeric cell, a plain digit/decimal string, or a millions-scale
/// "1,234.5" string. No '$' prefix and no plain thousands grouping exist in
/// this source; the "thousands.fraction in millions" rule exists ONLY here
/// and must not be folded into the budgets variant.
pub struct BomGrossParser {
    allowed: Regex,
    digits: Regex,
}

impl BomGrossParser {
    pub fn new() -> Self {
        BomGrossParser {
            allowed: Regex::new(r"^[0-9,.]*$").unwrap(),
            digits: Regex::new(r"^\d+$").unwrap(),
        }
    }

    fn parse_str(&self, s: &str) -> Option<u64> {
        // An empty cell means no release in that market.
        if s.is_empty() {
            return Some(0);
        }
        // Pure digit string.
        if self.digits.is_match(s) {
            return parse_digits(s);
        }
        let commas = s.matches(',').count();
        let points = s.matches('.').count();
        // Plain decimal like "1235356.343", truncated.
        if points == 1 && commas == 0 {
            return float_truncate(s);
        }
        // A lone comma without a decimal point ("1235356,343") is ambiguous.
        if commas == 1 && points == 0 {
            return None;
        }
        // Any character outside {digits, ',', '.'}; '$' counts as invalid here.
        if !self.allowed.is_match(s) {
            return None;
        }
        if points > 1 || commas > 1 {
            return None;
        }
        // Exactly one of each left: the millions pattern "D,DDD.D...".
        self.millions(s)
    }

    /// "1,234.5" reads as 1234.5 million dollars. The decimal point must sit
    /// exactly four characters after the comma; "1.454,0" and "1,45.9" fail.
    fn millions(&self, s: &str) -> Option<u64> {
        let comma_idx = s.find(',')?;
        let point_idx = s.find('.')?;
        if point_idx < comma_idx || point_idx - comma_idx != 4 {
            return None;
        }
        let cleaned = s.replace(',', "");
        match cleaned.parse::<f64>() {
            Ok(value) => Some((value * 1_000_000.0) as u64),
            Err(_) => {
                warn!("Cannot convert value {s:?} to a millions dollar amount");
                None
            }
        }
    }
}

impl GrossValueParser for BomGrossParser {
    fn parse(&self, raw: Option<&str>) -> Option<u64> {
        match raw {
            None => Some(0),
            Some(s) => self.parse_str(s),
        }
    }

    fn parse_numeric(&self, value: Option<f64>) -> Option<u64> {
        numeric_to_dollars(value)
    }
}
