#[path = "../processor/revenue_parser.rs"]
mod revenue_parser;

use revenue_parser::{BomGrossParser, GrossValueParser, TnGrossParser};

/// Manual harness: runs both gross-revenue parsers over a table of
/// representative raw tokens and prints the classifications side by side.
fn main() {
    println!("=== GROSS REVENUE PARSER CHECK ===\n");

    let samples = [
        "",
        "0",
        "$0",
        "$950",
        "425000000",
        "$425,000,000",
        "$2,776,345,279",
        "1,234,567",
        "12,34,567",
        "1235356.343",
        "1235356,343",
        "1,234.0",
        "1,45.9",
        "1.454,0",
        "434,454.454,345",
        "$1,234,000,000.00",
        "1.2.3",
        "N/A",
        "12-30",
    ];

    let tn = TnGrossParser::new();
    let bom = BomGrossParser::new();

    println!("{:<22} {:>18} {:>18}", "raw value", "tn (budgets)", "bom (gross)");
    println!("{}", "-".repeat(60));
    for sample in samples {
        println!(
            "{:<22} {:>18} {:>18}",
            format!("{sample:?}"),
            verdict(tn.parse(Some(sample))),
            verdict(bom.parse(Some(sample)))
        );
    }

    println!("\nNumeric cells:");
    for value in [None, Some(f64::NAN), Some(760507625.0), Some(-1.0)] {
        println!(
            "{:<22} {:>18} {:>18}",
            format!("{value:?}"),
            verdict(tn.parse_numeric(value)),
            verdict(bom.parse_numeric(value))
        );
    }
}

fn verdict(result: Option<u64>) -> String {
    match result {
        Some(dollars) => dollars.to_string(),
        None => "unparseable".to_string(),
    }
}
