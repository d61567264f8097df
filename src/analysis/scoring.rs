use serde::Serialize;

use crate::models::StockRecord;

/// Score assigned to a ratio that is missing, non-positive, or over the
/// EV/EBITDA admissibility cap. Enters the aggregate mean as-is.
pub const PENALTY_SCORE: f64 = -2.0;

/// Upper bound of the normalized score range.
pub const SCORE_MAX: f64 = 10.0;

/// EV/EBITDA values above this are treated as inadmissible.
pub const EV_EBITDA_CAP: f64 = 100.0;

/// Minimum number of valid ratios a stock needs before it can lead its sector.
pub const LEADER_MIN_VALID_RATIOS: usize = 2;

/// The four ratios that feed the aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ratio {
    PeRatio,
    PriceToBook,
    EvToEbitda,
    ReturnOnEquity,
}

impl Ratio {
    pub const ALL: [Ratio; 4] = [
        Ratio::PeRatio,
        Ratio::PriceToBook,
        Ratio::EvToEbitda,
        Ratio::ReturnOnEquity,
    ];

    /// Whether a smaller value of this ratio is the favorable one.
    pub fn lower_is_better(self) -> bool {
        !matches!(self, Ratio::ReturnOnEquity)
    }

    /// Admissibility cap, where one applies.
    pub fn cap(self) -> Option<f64> {
        match self {
            Ratio::EvToEbitda => Some(EV_EBITDA_CAP),
            _ => None,
        }
    }

    pub fn value_of(self, record: &StockRecord) -> Option<f64> {
        match self {
            Ratio::PeRatio => record.pe_ratio,
            Ratio::PriceToBook => record.price_to_book,
            Ratio::EvToEbitda => record.ev_to_ebitda,
            Ratio::ReturnOnEquity => record.return_on_equity,
        }
    }

    /// A ratio value scores only when it is finite, positive and under the cap.
    pub fn is_valid(self, value: f64) -> bool {
        value.is_finite() && value > 0.0 && self.cap().map_or(true, |cap| value <= cap)
    }
}

/// Best and worst valid value of one ratio across a sector group.
///
/// `best` is the minimum for lower-is-better ratios and the maximum for
/// higher-is-better ones. Both are 0.0 when the sector has no valid value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricBounds {
    pub best: f64,
    pub worst: f64,
}

impl MetricBounds {
    const EMPTY: MetricBounds = MetricBounds { best: 0.0, worst: 0.0 };

    /// Compute bounds over the valid subset of `group` for `ratio`.
    pub fn compute(group: &[StockRecord], ratio: Ratio) -> MetricBounds {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut any = false;

        for record in group {
            if let Some(value) = ratio.value_of(record) {
                if ratio.is_valid(value) {
                    min = min.min(value);
                    max = max.max(value);
                    any = true;
                }
            }
        }

        if !any {
            return MetricBounds::EMPTY;
        }

        if ratio.lower_is_better() {
            MetricBounds { best: min, worst: max }
        } else {
            MetricBounds { best: max, worst: min }
        }
    }
}

/// Bounds for all four scored ratios of one sector group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectorBounds {
    pub pe_ratio: MetricBounds,
    pub price_to_book: MetricBounds,
    pub ev_to_ebitda: MetricBounds,
    pub return_on_equity: MetricBounds,
}

impl SectorBounds {
    pub fn compute(group: &[StockRecord]) -> SectorBounds {
        SectorBounds {
            pe_ratio: MetricBounds::compute(group, Ratio::PeRatio),
            price_to_book: MetricBounds::compute(group, Ratio::PriceToBook),
            ev_to_ebitda: MetricBounds::compute(group, Ratio::EvToEbitda),
            return_on_equity: MetricBounds::compute(group, Ratio::ReturnOnEquity),
        }
    }

    pub fn get(&self, ratio: Ratio) -> MetricBounds {
        match ratio {
            Ratio::PeRatio => self.pe_ratio,
            Ratio::PriceToBook => self.price_to_book,
            Ratio::EvToEbitda => self.ev_to_ebitda,
            Ratio::ReturnOnEquity => self.return_on_equity,
        }
    }
}

/// Normalize one raw ratio value into [0, 10], or the penalty for invalid
/// input. A degenerate sector (single valid value, or all equal) yields the
/// maximum score.
pub fn normalize(value: Option<f64>, bounds: MetricBounds, ratio: Ratio) -> f64 {
    let value = match value {
        Some(v) if ratio.is_valid(v) => v,
        _ => return PENALTY_SCORE,
    };

    let spread = if ratio.lower_is_better() {
        bounds.worst - bounds.best
    } else {
        bounds.best - bounds.worst
    };

    if spread <= 0.0 {
        return SCORE_MAX;
    }

    let raw = if ratio.lower_is_better() {
        SCORE_MAX * (bounds.worst - value) / spread
    } else {
        SCORE_MAX * (value - bounds.worst) / spread
    };

    // Guards floating-point overshoot at the extremes.
    raw.clamp(0.0, SCORE_MAX)
}

/// Per-stock scoring result over the four ratios.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub code: String,
    pub pe_score: f64,
    pub price_to_book_score: f64,
    pub ev_to_ebitda_score: f64,
    pub roe_score: f64,
    pub final_score: f64,
    pub valid_count: usize,
}

impl ScoreCard {
    /// Score one stock against its sector bounds.
    ///
    /// Penalized ratios keep their -2 in the mean; this deliberately drags
    /// down stocks with missing or bad data instead of shrinking the
    /// denominator. A stock with no valid ratio at all scores 0.
    pub fn compute(record: &StockRecord, bounds: &SectorBounds) -> ScoreCard {
        let mut scores = [0.0f64; 4];
        let mut valid_count = 0;

        for (slot, ratio) in scores.iter_mut().zip(Ratio::ALL) {
            *slot = normalize(ratio.value_of(record), bounds.get(ratio), ratio);
            if *slot != PENALTY_SCORE {
                valid_count += 1;
            }
        }

        let final_score = if valid_count > 0 {
            scores.iter().sum::<f64>() / scores.len() as f64
        } else {
            0.0
        };

        ScoreCard {
            code: record.code.clone(),
            pe_score: scores[0],
            price_to_book_score: scores[1],
            ev_to_ebitda_score: scores[2],
            roe_score: scores[3],
            final_score,
            valid_count,
        }
    }
}

/// Score every stock of a sector group, in group order.
pub fn score_sector(group: &[StockRecord], bounds: &SectorBounds) -> Vec<ScoreCard> {
    group
        .iter()
        .map(|record| ScoreCard::compute(record, bounds))
        .collect()
}

/// Order score cards best-first: stocks with at least two valid ratios come
/// before thinner ones, scored stocks before unscored ones, then by final
/// score descending. The sort is stable, so rank-1 ties keep group order.
pub fn rank(cards: &[ScoreCard]) -> Vec<ScoreCard> {
    let mut ranked = cards.to_vec();
    ranked.sort_by(|a, b| {
        let a_enough = a.valid_count >= LEADER_MIN_VALID_RATIOS;
        let b_enough = b.valid_count >= LEADER_MIN_VALID_RATIOS;
        b_enough
            .cmp(&a_enough)
            .then_with(|| (b.final_score > 0.0).cmp(&(a.final_score > 0.0)))
            .then_with(|| {
                b.final_score
                    .partial_cmp(&a.final_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    ranked
}

/// Arithmetic means of the tracked metrics over a sector group, taken over
/// positive finite values only. 0.0 where the sector has none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SectorAverages {
    pub pe_ratio: f64,
    pub price_to_book: f64,
    pub ev_to_ebitda: f64,
    pub return_on_equity: f64,
    pub free_float_pct: f64,
}

impl SectorAverages {
    pub fn compute(group: &[StockRecord]) -> SectorAverages {
        SectorAverages {
            pe_ratio: mean_positive(group.iter().map(|r| r.pe_ratio)),
            price_to_book: mean_positive(group.iter().map(|r| r.price_to_book)),
            ev_to_ebitda: mean_positive(group.iter().map(|r| r.ev_to_ebitda)),
            return_on_equity: mean_positive(group.iter().map(|r| r.return_on_equity)),
            free_float_pct: mean_positive(group.iter().map(|r| r.free_float_pct)),
        }
    }
}

fn mean_positive(values: impl Iterator<Item = Option<f64>>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values.flatten() {
        if value.is_finite() && value > 0.0 {
            sum += value;
            count += 1;
        }
    }
    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}
