use csv::StringRecord;

use crate::dataset::DatasetError;
use crate::models::StockRecord;

/// Column indices for the canonical fields, resolved once per dataset load.
///
/// Spreadsheet exports never agree on header spelling, so each canonical
/// field carries a list of search terms: an exact case-insensitive match
/// wins, otherwise the first header containing a term is taken.
#[derive(Debug, Clone)]
pub struct HeaderSchema {
    code: usize,
    name: Option<usize>,
    sector: usize,
    pe_ratio: Option<usize>,
    price_to_book: Option<usize>,
    ev_to_ebitda: Option<usize>,
    return_on_equity: Option<usize>,
    closing_price: Option<usize>,
    market_cap: Option<usize>,
    paid_in_capital: Option<usize>,
    free_float_pct: Option<usize>,
}

impl HeaderSchema {
    /// Resolve the canonical fields against the raw header row.
    ///
    /// `code` and `sector` are required (lookup and grouping keys); every
    /// other column degrades to missing values when absent.
    pub fn resolve(headers: &[String]) -> Result<HeaderSchema, DatasetError> {
        let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();

        let find = |terms: &[&str]| -> Option<usize> {
            for term in terms {
                if let Some(idx) = lowered.iter().position(|h| h == term) {
                    return Some(idx);
                }
            }
            lowered
                .iter()
                .position(|h| terms.iter().any(|term| h.contains(term)))
        };

        let code = find(&["kod"]).ok_or(DatasetError::MissingColumn { field: "code" })?;
        let sector = find(&["sektör", "sektor"])
            .ok_or(DatasetError::MissingColumn { field: "sector" })?;

        Ok(HeaderSchema {
            code,
            sector,
            name: find(&["hisse adı", "hisse adi"]),
            pe_ratio: find(&["fk", "f/k", "fiyat kazanç"]),
            price_to_book: find(&["pd/dd", "pd dd"]),
            ev_to_ebitda: find(&["fd/favök", "fd/favok"]),
            return_on_equity: find(&["özsermaye karlılığı", "özsermaye karlilik", "karlılık"]),
            closing_price: find(&["kapanış(tl)", "kapanış (tl)", "kapanis(tl)"]),
            market_cap: find(&["piyasa değeri(mn tl)", "piyasa değeri (mn tl)"]),
            paid_in_capital: find(&["ödenmiş sermaye (mn tl)", "ödenmiş sermaye(mn tl)"]),
            free_float_pct: find(&["halka açıklıkoranı (%)", "halka açıklık oran", "halka açık"]),
        })
    }

    /// Build a typed record from one CSV row. Rows without a ticker code are
    /// dropped.
    pub fn record_from_row(&self, row: &StringRecord) -> Option<StockRecord> {
        let code = row.get(self.code)?.trim();
        if code.is_empty() {
            return None;
        }
        let code = code.to_uppercase();

        let text = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let number = |idx: Option<usize>| -> Option<f64> {
            idx.and_then(|i| row.get(i)).and_then(coerce_numeric)
        };

        Some(StockRecord {
            name: text(self.name).unwrap_or_else(|| code.clone()),
            sector: text(Some(self.sector)).unwrap_or_default(),
            pe_ratio: number(self.pe_ratio),
            price_to_book: number(self.price_to_book),
            ev_to_ebitda: number(self.ev_to_ebitda),
            return_on_equity: number(self.return_on_equity),
            closing_price: number(self.closing_price),
            market_cap: number(self.market_cap),
            paid_in_capital: number(self.paid_in_capital),
            free_float_pct: number(self.free_float_pct),
            code,
        })
    }
}

/// Parse a locale-formatted numeric cell: comma decimal separator, optional
/// percent sign. Anything else stays non-numeric and becomes a missing value.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let without_percent = if trimmed.contains('%') {
        trimmed.replace('%', "")
    } else {
        trimmed.to_string()
    };

    without_percent.trim().replace(',', ".").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ratio_columns_resolve_from_turkish_headers() {
        let schema = HeaderSchema::resolve(&headers(&[
            "Kod",
            "Hisse Adı",
            "Sektör",
            "FD/FAVÖK",
            "FK",
        ]))
        .unwrap();

        let row = StringRecord::from(vec!["garan", "Garanti", "Bankacilik", "55,0", "6,1"]);
        let record = schema.record_from_row(&row).unwrap();
        assert_eq!(record.pe_ratio, Some(6.1));
        assert_eq!(record.ev_to_ebitda, Some(55.0));
    }

    #[test]
    fn exact_match_wins_over_an_earlier_substring_hit() {
        // "Karlılık Trendi" contains the "karlılık" fallback term and sits
        // first; the exact "Özsermaye Karlılığı" header must still win.
        let schema = HeaderSchema::resolve(&headers(&[
            "Kod",
            "Sektör",
            "Karlılık Trendi",
            "Özsermaye Karlılığı",
        ]))
        .unwrap();

        let row = StringRecord::from(vec!["GARAN", "Bankacilik", "yukari", "28,9"]);
        let record = schema.record_from_row(&row).unwrap();
        assert_eq!(record.return_on_equity, Some(28.9));
    }

    #[test]
    fn substring_fallback_resolves_sloppy_headers() {
        let schema = HeaderSchema::resolve(&headers(&[
            "Kod",
            "Sektör",
            "Halka AçıklıkOranı (%)",
            "Özsermaye Karlılığı",
        ]))
        .unwrap();

        let row = StringRecord::from(vec!["THYAO", "Ulastirma", "%50,4", "28,9"]);
        let record = schema.record_from_row(&row).unwrap();
        assert_eq!(record.free_float_pct, Some(50.4));
        assert_eq!(record.return_on_equity, Some(28.9));
    }

    #[test]
    fn missing_code_column_is_an_error() {
        let err = HeaderSchema::resolve(&headers(&["Hisse Adı", "Sektör"])).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { field: "code" }));
    }

    #[test]
    fn missing_sector_column_is_an_error() {
        let err = HeaderSchema::resolve(&headers(&["Kod", "Hisse Adı"])).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { field: "sector" }));
    }

    #[test]
    fn rows_without_code_are_dropped() {
        let schema = HeaderSchema::resolve(&headers(&["Kod", "Sektör"])).unwrap();
        assert!(schema.record_from_row(&StringRecord::from(vec!["", "Bankacilik"])).is_none());
    }

    #[test]
    fn codes_are_uppercased_and_name_falls_back_to_code() {
        let schema = HeaderSchema::resolve(&headers(&["Kod", "Sektör"])).unwrap();
        let record = schema
            .record_from_row(&StringRecord::from(vec!["garan", "Bankacilik"]))
            .unwrap();
        assert_eq!(record.code, "GARAN");
        assert_eq!(record.name, "GARAN");
    }

    #[test]
    fn coerce_handles_comma_decimals_and_percent() {
        assert_eq!(coerce_numeric("12,5"), Some(12.5));
        assert_eq!(coerce_numeric("-3,25"), Some(-3.25));
        assert_eq!(coerce_numeric("%32,7"), Some(32.7));
        assert_eq!(coerce_numeric("32,7%"), Some(32.7));
        assert_eq!(coerce_numeric("140"), Some(140.0));
        assert_eq!(coerce_numeric("  7,0  "), Some(7.0));
    }

    #[test]
    fn coerce_rejects_non_numeric_cells() {
        assert_eq!(coerce_numeric(""), None);
        assert_eq!(coerce_numeric("-"), None);
        assert_eq!(coerce_numeric("a.d."), None);
        assert_eq!(coerce_numeric("Bankacilik"), None);
    }
}
