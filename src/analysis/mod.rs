pub mod narrative;
pub mod scoring;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::models::StockRecord;
use narrative::Commentary;
use scoring::{ScoreCard, SectorAverages, SectorBounds, LEADER_MIN_VALID_RATIOS};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("stock `{code}` not found in the loaded dataset")]
    StockNotFound { code: String },
}

/// One row of the sector ranking table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStock {
    pub code: String,
    pub final_score: f64,
    pub valid_count: usize,
}

/// Complete scoring result for one stock against its sector peers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockAssessment {
    pub code: String,
    pub name: String,
    pub sector: String,
    pub final_score: f64,
    pub valid_count: usize,
    pub is_sector_leader: bool,
    pub sector_averages: SectorAverages,
    pub sector_ranking: Vec<RankedStock>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Score `code` against its sector peers within `records`.
///
/// Pure over its inputs: the sector group, bounds, score cards, ranking,
/// averages and commentary are all derived fresh on every call, so the same
/// dataset and code always produce the same assessment. Partial or malformed
/// data degrades to sentinel scores; the only error is an unknown code.
pub fn evaluate(code: &str, records: &[StockRecord]) -> Result<StockAssessment, AnalysisError> {
    let stock = records
        .iter()
        .find(|r| r.code.eq_ignore_ascii_case(code))
        .ok_or_else(|| AnalysisError::StockNotFound { code: code.to_string() })?;

    let group: Vec<StockRecord> = records
        .iter()
        .filter(|r| r.sector == stock.sector)
        .cloned()
        .collect();

    let bounds = SectorBounds::compute(&group);
    let cards = scoring::score_sector(&group, &bounds);
    let ranking = scoring::rank(&cards);
    let averages = SectorAverages::compute(&group);

    let card = card_for(&cards, &stock.code)
        .ok_or_else(|| AnalysisError::StockNotFound { code: code.to_string() })?;

    let is_sector_leader = ranking
        .first()
        .map_or(false, |top| top.code == stock.code)
        && card.final_score > 0.0
        && card.valid_count >= LEADER_MIN_VALID_RATIOS;

    let Commentary { strengths, weaknesses } = narrative::commentary(stock, &bounds, &averages);

    debug!(
        code = %stock.code,
        sector = %stock.sector,
        peers = group.len(),
        score = card.final_score,
        leader = is_sector_leader,
        "sector assessment computed"
    );

    Ok(StockAssessment {
        code: stock.code.clone(),
        name: stock.name.clone(),
        sector: stock.sector.clone(),
        final_score: card.final_score,
        valid_count: card.valid_count,
        is_sector_leader,
        sector_averages: averages,
        sector_ranking: ranking
            .into_iter()
            .map(|c| RankedStock {
                code: c.code,
                final_score: c.final_score,
                valid_count: c.valid_count,
            })
            .collect(),
        strengths,
        weaknesses,
    })
}

fn card_for<'a>(cards: &'a [ScoreCard], code: &str) -> Option<&'a ScoreCard> {
    cards.iter().find(|c| c.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(code: &str, sector: &str, pe: Option<f64>, roe: Option<f64>) -> StockRecord {
        StockRecord {
            code: code.to_string(),
            name: format!("{code} A.S."),
            sector: sector.to_string(),
            pe_ratio: pe,
            price_to_book: None,
            ev_to_ebitda: None,
            return_on_equity: roe,
            closing_price: None,
            market_cap: None,
            paid_in_capital: None,
            free_float_pct: None,
        }
    }

    #[test]
    fn unknown_code_is_an_error() {
        let records = vec![record("GARAN", "Bankacilik", Some(5.0), Some(20.0))];
        let err = evaluate("NOPE", &records).unwrap_err();
        assert!(matches!(err, AnalysisError::StockNotFound { .. }));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let records = vec![record("GARAN", "Bankacilik", Some(5.0), Some(20.0))];
        assert_eq!(evaluate("garan", &records).unwrap().code, "GARAN");
    }

    #[test]
    fn leader_needs_two_valid_ratios() {
        // Only one valid ratio, so even the sole stock of the sector
        // cannot lead it.
        let records = vec![record("GARAN", "Bankacilik", Some(5.0), None)];
        let assessment = evaluate("GARAN", &records).unwrap();

        assert!(!assessment.is_sector_leader);
        assert_eq!(assessment.valid_count, 1);
    }

    #[test]
    fn top_ranked_queried_stock_with_enough_data_leads() {
        let records = vec![
            record("GARAN", "Bankacilik", Some(4.0), Some(30.0)),
            record("AKBNK", "Bankacilik", Some(8.0), Some(15.0)),
        ];

        let garan = evaluate("GARAN", &records).unwrap();
        assert!(garan.is_sector_leader);

        let akbnk = evaluate("AKBNK", &records).unwrap();
        assert!(!akbnk.is_sector_leader);
        assert_eq!(akbnk.sector_ranking[0].code, "GARAN");
    }

    #[test]
    fn sector_group_excludes_other_sectors() {
        let records = vec![
            record("GARAN", "Bankacilik", Some(4.0), Some(30.0)),
            record("THYAO", "Ulastirma", Some(2.0), Some(40.0)),
        ];

        let assessment = evaluate("GARAN", &records).unwrap();
        assert_eq!(assessment.sector_ranking.len(), 1);
        // Alone in its sector GARAN takes the degenerate maximum on its two
        // valid ratios; the two missing ones still penalize the mean.
        assert_eq!(assessment.final_score, (10.0 + 10.0 - 2.0 - 2.0) / 4.0);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let records = vec![
            record("GARAN", "Bankacilik", Some(4.0), Some(30.0)),
            record("AKBNK", "Bankacilik", Some(8.0), None),
            record("YKBNK", "Bankacilik", None, Some(12.0)),
        ];

        let first = evaluate("AKBNK", &records).unwrap();
        let second = evaluate("AKBNK", &records).unwrap();
        assert_eq!(first, second);
    }
}
