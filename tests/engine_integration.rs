use bist_radar::analysis::{self, AnalysisError};
use bist_radar::dataset;
use bist_radar::models::StockRecord;
use pretty_assertions::assert_eq;

const DATASET: &str = "\
Kod;Hisse Adı;Sektör;Kapanış(TL);Piyasa Değeri(mn TL);Ödenmiş Sermaye (mn TL);Halka AçıklıkOranı (%);FK;PD/DD;FD/FAVÖK;Özsermaye Karlılığı
ALFA;Alfa Holding;Sanayi;10,0;1000;90;25,0;5,0;1,0;4,0;30,0
BETA;Beta Metal;Sanayi;20,0;2000;600;55,0;10,0;2,0;8,0;20,0
GAMA;Gama Demir;Sanayi;30,0;3000;1500;80,0;15,0;3,0;150,0;10,0
DELT;Delta Gida;Gida;5,0;500;50;40,0;-;-;-;-
EPSI;Epsilon Enerji;Enerji;8,0;800;200;35,0;7,5;1,5;6,0;18,0
ZETA;Zeta Enerji;Enerji;9,0;900;300;45,0;7,5;1,5;6,0;18,0
";

fn records() -> Vec<StockRecord> {
    dataset::parse_csv(DATASET.as_bytes()).expect("fixture dataset parses")
}

#[test]
fn best_in_sector_scores_the_maximum() {
    let records = records();
    let alfa = analysis::evaluate("ALFA", &records).unwrap();

    // ALFA holds the best value of all four ratios in its sector.
    assert_eq!(alfa.final_score, 10.0);
    assert_eq!(alfa.valid_count, 4);
    assert!(alfa.is_sector_leader);
}

#[test]
fn midpoint_stock_scores_linearly() {
    let records = records();
    let beta = analysis::evaluate("BETA", &records).unwrap();

    // P/E values in the sector are [5, 10, 15]: the midpoint normalizes
    // to 5; EV/EBITDA bounds exclude GAMA's capped-out 150, leaving BETA
    // at the worst admissible value.
    assert_eq!(beta.final_score, (5.0 + 5.0 + 0.0 + 5.0) / 4.0);
    assert!(!beta.is_sector_leader);
}

#[test]
fn capped_ev_to_ebitda_penalizes_the_aggregate() {
    let records = records();
    let gama = analysis::evaluate("GAMA", &records).unwrap();

    // Worst on three ratios plus a -2 for the inadmissible EV/EBITDA.
    assert_eq!(gama.valid_count, 3);
    assert_eq!(gama.final_score, (0.0 + 0.0 - 2.0 + 0.0) / 4.0);
}

#[test]
fn stock_without_valid_ratios_scores_zero_and_never_leads() {
    let records = records();
    let delta = analysis::evaluate("DELT", &records).unwrap();

    assert_eq!(delta.valid_count, 0);
    assert_eq!(delta.final_score, 0.0);
    // Alone at the top of its one-stock sector, but unscored.
    assert!(!delta.is_sector_leader);
}

#[test]
fn degenerate_sector_gives_everyone_the_maximum() {
    let records = records();
    let epsi = analysis::evaluate("EPSI", &records).unwrap();
    let zeta = analysis::evaluate("ZETA", &records).unwrap();

    assert_eq!(epsi.final_score, 10.0);
    assert_eq!(zeta.final_score, 10.0);

    // The rank-1 tie keeps dataset order, so only the first entry can lead.
    assert!(epsi.is_sector_leader);
    assert!(!zeta.is_sector_leader);
    assert_eq!(zeta.sector_ranking[0].code, "EPSI");
}

#[test]
fn ranking_orders_scored_stocks_first() {
    let records = records();
    let alfa = analysis::evaluate("ALFA", &records).unwrap();

    let order: Vec<&str> = alfa
        .sector_ranking
        .iter()
        .map(|entry| entry.code.as_str())
        .collect();
    assert_eq!(order, vec!["ALFA", "BETA", "GAMA"]);
}

#[test]
fn sector_averages_cover_the_five_tracked_metrics() {
    let records = records();
    let alfa = analysis::evaluate("ALFA", &records).unwrap();
    let averages = alfa.sector_averages;

    assert_eq!(averages.pe_ratio, 10.0);
    assert_eq!(averages.price_to_book, 2.0);
    // Display averages keep the over-cap EV/EBITDA value.
    assert_eq!(averages.ev_to_ebitda, 54.0);
    assert_eq!(averages.return_on_equity, 20.0);
    assert!((averages.free_float_pct - 160.0 / 3.0).abs() < 1e-9);
}

#[test]
fn commentary_prefers_best_in_class_over_below_average() {
    let records = records();
    let alfa = analysis::evaluate("ALFA", &records).unwrap();

    assert!(alfa
        .strengths
        .iter()
        .any(|m| m.contains("Lowest P/E ratio")));
    assert!(!alfa
        .strengths
        .iter()
        .any(|m| m.contains("P/E ratio") && m.contains("below the sector average")));

    let gama = analysis::evaluate("GAMA", &records).unwrap();
    assert!(gama
        .weaknesses
        .iter()
        .any(|m| m.contains("EV/EBITDA ratio is extremely high")));
}

#[test]
fn unknown_code_surfaces_a_not_found_error() {
    let records = records();
    let err = analysis::evaluate("YOKYOK", &records).unwrap_err();
    assert!(matches!(err, AnalysisError::StockNotFound { .. }));
}

#[test]
fn same_input_twice_yields_identical_output() {
    let records = records();
    let first = analysis::evaluate("BETA", &records).unwrap();
    let second = analysis::evaluate("BETA", &records).unwrap();
    assert_eq!(first, second);

    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json);
}
