use serde::{Deserialize, Serialize};

/// One cleaned row of the loaded listing dataset.
///
/// Numeric fields are `None` when the source cell was empty or not a number;
/// validity rules (positive, EV/EBITDA cap) are applied by the analysis
/// layer, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub code: String,
    pub name: String,
    pub sector: String,
    pub pe_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub closing_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub paid_in_capital: Option<f64>,
    pub free_float_pct: Option<f64>,
}

impl StockRecord {
    /// All distinct sector names in the dataset, sorted, without duplicates.
    pub fn sectors(records: &[StockRecord]) -> Vec<String> {
        let mut sectors: Vec<String> = records
            .iter()
            .map(|r| r.sector.clone())
            .filter(|s| !s.is_empty())
            .collect();
        sectors.sort();
        sectors.dedup();
        sectors
    }
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub dataset_source: String,
    pub database_path: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            dataset_source: std::env::var("BIST_DATASET")
                .unwrap_or_else(|_| "borsa_istanbul.csv".to_string()),
            database_path: std::env::var("BIST_DATABASE_PATH")
                .unwrap_or_else(|_| "watchlist.db".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, sector: &str) -> StockRecord {
        StockRecord {
            code: code.to_string(),
            name: format!("{code} A.S."),
            sector: sector.to_string(),
            pe_ratio: None,
            price_to_book: None,
            ev_to_ebitda: None,
            return_on_equity: None,
            closing_price: None,
            market_cap: None,
            paid_in_capital: None,
            free_float_pct: None,
        }
    }

    #[test]
    fn sectors_are_sorted_and_deduplicated() {
        let records = vec![
            record("THYAO", "Ulastirma"),
            record("GARAN", "Bankacilik"),
            record("AKBNK", "Bankacilik"),
        ];

        let sectors = StockRecord::sectors(&records);
        assert_eq!(sectors, vec!["Bankacilik".to_string(), "Ulastirma".to_string()]);
    }

    #[test]
    fn empty_sector_names_are_skipped() {
        let records = vec![record("XXXXX", ""), record("GARAN", "Bankacilik")];
        assert_eq!(StockRecord::sectors(&records), vec!["Bankacilik".to_string()]);
    }
}
