use crate::analysis::scoring::{SectorAverages, SectorBounds, EV_EBITDA_CAP};
use crate::models::StockRecord;

/// Tolerance for treating a ratio as equal to the sector's best value.
pub const BEST_MATCH_EPSILON: f64 = 0.01;

/// Qualitative observations about one stock relative to its sector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Commentary {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Generate strengths/weaknesses commentary for one stock.
///
/// Observations are emitted in a fixed order: paid-in capital, free float,
/// P/E, P/B, EV/EBITDA, return on equity. Each rule compares the raw record
/// value against the sector best (within [`BEST_MATCH_EPSILON`]) and the
/// sector average.
pub fn commentary(
    stock: &StockRecord,
    bounds: &SectorBounds,
    averages: &SectorAverages,
) -> Commentary {
    let mut out = Commentary::default();

    assess_paid_in_capital(stock, &mut out);
    assess_free_float(stock, &mut out);
    assess_pe_ratio(stock, bounds, averages, &mut out);
    assess_price_to_book(stock, bounds, averages, &mut out);
    assess_ev_to_ebitda(stock, bounds, averages, &mut out);
    assess_return_on_equity(stock, averages, &mut out);

    out
}

fn assess_paid_in_capital(stock: &StockRecord, out: &mut Commentary) {
    let Some(capital) = stock.paid_in_capital else {
        return;
    };

    if capital < 100.0 {
        out.strengths.push(format!(
            "Low paid-in capital ({capital:.0} mn TL) leaves room for financial flexibility"
        ));
    } else if capital < 500.0 {
        out.strengths
            .push(format!("Moderate paid-in capital ({capital:.0} mn TL)"));
    } else if capital > 5000.0 {
        out.weaknesses.push(format!(
            "Very high paid-in capital ({capital:.0} mn TL) can depress equity returns"
        ));
    } else if capital > 1000.0 {
        out.weaknesses
            .push(format!("High paid-in capital ({capital:.0} mn TL)"));
    }
}

fn assess_free_float(stock: &StockRecord, out: &mut Commentary) {
    let Some(free_float) = stock.free_float_pct else {
        return;
    };

    if free_float > 70.0 {
        out.weaknesses.push(format!(
            "High free float ({free_float:.0}%) dilutes ownership concentration"
        ));
    } else if free_float < 30.0 {
        out.strengths.push(format!(
            "Low free float ({free_float:.0}%) supports management stability"
        ));
    }
}

fn assess_pe_ratio(
    stock: &StockRecord,
    bounds: &SectorBounds,
    averages: &SectorAverages,
    out: &mut Commentary,
) {
    let value = stock.pe_ratio.filter(|v| *v > 0.0);
    let Some(value) = value else {
        out.weaknesses
            .push("P/E ratio cannot be computed (negative or zero earnings)".to_string());
        return;
    };

    let best = bounds.pe_ratio.best;
    let average = averages.pe_ratio;

    if best > 0.0 && (value - best).abs() < BEST_MATCH_EPSILON {
        out.strengths.push(format!(
            "Lowest P/E ratio ({value:.2}) in the sector, cheapest stock on earnings"
        ));
    } else if average > 0.0 {
        if value < average {
            let gap = (average - value) / average * 100.0;
            out.strengths.push(format!(
                "P/E ratio ({value:.2}) is {gap:.0}% below the sector average"
            ));
        } else {
            let gap = (value - average) / average * 100.0;
            out.weaknesses.push(format!(
                "P/E ratio ({value:.2}) is {gap:.0}% above the sector average"
            ));
        }
    }
}

fn assess_price_to_book(
    stock: &StockRecord,
    bounds: &SectorBounds,
    averages: &SectorAverages,
    out: &mut Commentary,
) {
    let value = stock.price_to_book.filter(|v| *v > 0.0);
    let Some(value) = value else {
        out.weaknesses
            .push("P/B ratio cannot be computed".to_string());
        return;
    };

    let best = bounds.price_to_book.best;
    let average = averages.price_to_book;

    if best > 0.0 && (value - best).abs() < BEST_MATCH_EPSILON {
        out.strengths.push(format!(
            "Lowest P/B ratio ({value:.2}) in the sector, cheapest stock on book value"
        ));
    } else if average > 0.0 {
        if value < average {
            let gap = (average - value) / average * 100.0;
            out.strengths.push(format!(
                "P/B ratio ({value:.2}) is {gap:.0}% below the sector average"
            ));
        } else {
            let gap = (value - average) / average * 100.0;
            out.weaknesses.push(format!(
                "P/B ratio ({value:.2}) is {gap:.0}% above the sector average"
            ));
        }
    }
}

fn assess_ev_to_ebitda(
    stock: &StockRecord,
    bounds: &SectorBounds,
    averages: &SectorAverages,
    out: &mut Commentary,
) {
    let value = stock.ev_to_ebitda.filter(|v| *v > 0.0);
    let Some(value) = value else {
        out.weaknesses
            .push("EV/EBITDA ratio cannot be computed".to_string());
        return;
    };

    // The capped-out case wins over any relative comparison.
    if value > EV_EBITDA_CAP {
        out.weaknesses.push(format!(
            "EV/EBITDA ratio is extremely high ({value:.2}), operating profitability is weak"
        ));
        return;
    }

    let best = bounds.ev_to_ebitda.best;
    let average = averages.ev_to_ebitda;

    if best > 0.0 && (value - best).abs() < BEST_MATCH_EPSILON {
        out.strengths.push(format!(
            "Lowest EV/EBITDA ratio ({value:.2}) in the sector, cheapest stock on operating earnings"
        ));
    } else if average > 0.0 {
        if value < average {
            let gap = (average - value) / average * 100.0;
            out.strengths.push(format!(
                "EV/EBITDA ratio ({value:.2}) is {gap:.0}% below the sector average"
            ));
        } else {
            let gap = (value - average) / average * 100.0;
            out.weaknesses.push(format!(
                "EV/EBITDA ratio ({value:.2}) is {gap:.0}% above the sector average"
            ));
        }
    }
}

fn assess_return_on_equity(stock: &StockRecord, averages: &SectorAverages, out: &mut Commentary) {
    let value = stock.return_on_equity.filter(|v| *v > 0.0);
    let Some(value) = value else {
        out.weaknesses
            .push("Return on equity cannot be computed or is negative".to_string());
        return;
    };

    let average = averages.return_on_equity;
    if average <= 0.0 {
        return;
    }

    // A value exactly at the average lands in the mild-weakness branch.
    if value > average * 1.5 {
        let gap = (value - average) / average * 100.0;
        out.strengths.push(format!(
            "Return on equity ({value:.2}%) is {gap:.0}% above the sector average, well ahead of peers"
        ));
    } else if value > average {
        let gap = (value - average) / average * 100.0;
        out.strengths.push(format!(
            "Return on equity ({value:.2}%) is {gap:.0}% above the sector average"
        ));
    } else if value < average * 0.5 {
        let gap = (average - value) / average * 100.0;
        out.weaknesses.push(format!(
            "Return on equity ({value:.2}%) is {gap:.0}% below the sector average, far behind peers"
        ));
    } else {
        let gap = (average - value) / average * 100.0;
        out.weaknesses.push(format!(
            "Return on equity ({value:.2}%) is {gap:.0}% below the sector average"
        ));
    }
}
