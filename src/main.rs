use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use bist_radar::analysis;
use bist_radar::database::WatchlistStore;
use bist_radar::dataset;
use bist_radar::models::{Config, StockRecord};
use bist_radar::ui;

#[derive(Parser)]
#[command(
    name = "bist-radar",
    about = "Browse, filter and sector-score Borsa Istanbul stock listings",
    version
)]
struct Cli {
    /// CSV dataset path or HTTP URL (overrides BIST_DATASET)
    #[arg(long)]
    data: Option<String>,

    /// Sqlite path for the watchlist and notes (overrides BIST_DATABASE_PATH)
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Score one stock against its sector peers and print the assessment
    Score {
        code: String,
        /// Emit the assessment as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the listing table to stdout
    List {
        /// Restrict the output to one sector
        #[arg(long)]
        sector: Option<String>,
    },
    /// Compare two or more stocks side by side
    Compare {
        /// Ticker codes to compare
        #[arg(required = true, num_args = 2..)]
        codes: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Suppress most logs while the TUI owns the terminal; CLI subcommands
    // log normally.
    let (max_level, filter) = if cli.command.is_some() {
        (Level::INFO, "bist_radar=info")
    } else {
        (Level::ERROR, "bist_radar=error")
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(max_level)
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(data) = cli.data {
        config.dataset_source = data;
    }
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    let source = dataset::source_for(&config.dataset_source);
    let records = dataset::load(source.as_ref())
        .await
        .with_context(|| format!("failed to load dataset from {}", config.dataset_source))?;

    match cli.command {
        Some(Command::Score { code, json }) => print_assessment(&code, &records, json),
        Some(Command::List { sector }) => {
            print_listing(&records, sector.as_deref());
            Ok(())
        }
        Some(Command::Compare { codes }) => print_comparison(&codes, &records),
        None => {
            let store = WatchlistStore::new(&config.database_path)
                .await
                .context("failed to open the watchlist store")?;
            ui::run_app(records, store).await
        }
    }
}

fn print_assessment(code: &str, records: &[StockRecord], json: bool) -> Result<()> {
    let assessment = analysis::evaluate(code, records)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    println!("\n{} [{}] - {} sector", assessment.name, assessment.code, assessment.sector);
    if assessment.valid_count == 0 {
        println!("Total score: N/A (no valid ratios)");
    } else {
        println!(
            "Total score: {:.2} ({}/4 valid ratios){}",
            assessment.final_score,
            assessment.valid_count,
            if assessment.is_sector_leader { "  ★ Sector Leader" } else { "" }
        );
    }

    let averages = &assessment.sector_averages;
    println!("\nSector averages:");
    println!("  P/E {:.2}  P/B {:.2}  EV/EBITDA {:.2}  ROE {:.2}%  Free float {:.2}%",
        averages.pe_ratio,
        averages.price_to_book,
        averages.ev_to_ebitda,
        averages.return_on_equity,
        averages.free_float_pct,
    );

    println!("\nSector ranking:");
    for (i, entry) in assessment.sector_ranking.iter().enumerate() {
        let marker = if entry.code == assessment.code { " <-" } else { "" };
        if entry.valid_count == 0 {
            println!("  {:>2}. {:<7} N/A   ({}/4){marker}", i + 1, entry.code, entry.valid_count);
        } else {
            println!(
                "  {:>2}. {:<7} {:>5.2} ({}/4){marker}",
                i + 1,
                entry.code,
                entry.final_score,
                entry.valid_count
            );
        }
    }

    if !assessment.strengths.is_empty() {
        println!("\nStrengths:");
        for item in &assessment.strengths {
            println!("  + {item}");
        }
    }
    if !assessment.weaknesses.is_empty() {
        println!("\nWeaknesses:");
        for item in &assessment.weaknesses {
            println!("  - {item}");
        }
    }

    Ok(())
}

fn print_comparison(codes: &[String], records: &[StockRecord]) -> Result<()> {
    let mut stocks = Vec::new();
    for code in codes {
        let record = records
            .iter()
            .find(|r| r.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| anyhow::anyhow!("stock `{code}` not found in the loaded dataset"))?;
        let assessment = analysis::evaluate(&record.code, records)?;
        stocks.push((record.clone(), assessment));
    }

    // Indices of the stocks holding the best valid value for one metric;
    // ties are all marked.
    let best_indices = |values: &[Option<f64>], higher_is_better: bool| -> Vec<usize> {
        let valid: Vec<(usize, f64)> = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.filter(|v| *v > 0.0).map(|v| (i, v)))
            .collect();
        let target = if higher_is_better {
            valid.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max)
        } else {
            valid.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min)
        };
        valid
            .into_iter()
            .filter(|(_, v)| *v == target)
            .map(|(i, _)| i)
            .collect()
    };

    // `ranked` says whether and how the row marks a best cell; auxiliary
    // rows like market cap are informational only.
    let print_row = |label: &str, values: &[Option<f64>], ranked: Option<bool>| {
        let best = ranked.map(|higher| best_indices(values, higher)).unwrap_or_default();
        print!("{label:<18}");
        for (i, value) in values.iter().enumerate() {
            let cell = match value {
                Some(v) => format!("{v:.2}"),
                None => "-".to_string(),
            };
            let marker = if best.contains(&i) { "*" } else { " " };
            print!(" {cell:>11}{marker}");
        }
        println!();
    };

    print!("{:<18}", "");
    for (record, _) in &stocks {
        print!(" {:>11} ", record.code);
    }
    println!();

    print!("{:<18}", "Sector");
    for (record, _) in &stocks {
        print!(" {:>11} ", truncate(&record.sector, 11));
    }
    println!();

    let column = |f: fn(&StockRecord) -> Option<f64>| -> Vec<Option<f64>> {
        stocks.iter().map(|(record, _)| f(record)).collect()
    };

    print_row("Closing price", &column(|r| r.closing_price), Some(false));
    print_row("Market cap", &column(|r| r.market_cap), None);
    print_row("P/E ratio", &column(|r| r.pe_ratio), Some(false));
    print_row("P/B ratio", &column(|r| r.price_to_book), Some(false));
    print_row("EV/EBITDA", &column(|r| r.ev_to_ebitda), Some(false));
    print_row("Return on equity", &column(|r| r.return_on_equity), Some(true));
    print_row("Free float %", &column(|r| r.free_float_pct), None);

    print!("{:<18}", "Total score");
    for (_, assessment) in &stocks {
        if assessment.valid_count == 0 {
            print!(" {:>11} ", "N/A");
        } else {
            let leader = if assessment.is_sector_leader { "*" } else { " " };
            print!(" {:>11.2}{leader}", assessment.final_score);
        }
    }
    println!("\n{:>18}  (* best valid value in row; on the score row, sector leader)", "");

    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max.saturating_sub(1)).collect::<String>() + "…"
    }
}

fn print_listing(records: &[StockRecord], sector: Option<&str>) {
    let fmt = |value: Option<f64>| match value {
        Some(v) => format!("{v:.2}"),
        None => "-".to_string(),
    };

    println!(
        "{:<7} {:<28} {:<22} {:>9} {:>7} {:>7} {:>10} {:>8}",
        "Code", "Name", "Sector", "Close", "P/E", "P/B", "EV/EBITDA", "ROE %"
    );
    for record in records {
        if let Some(wanted) = sector {
            if record.sector != wanted {
                continue;
            }
        }
        println!(
            "{:<7} {:<28} {:<22} {:>9} {:>7} {:>7} {:>10} {:>8}",
            record.code,
            record.name,
            record.sector,
            fmt(record.closing_price),
            fmt(record.pe_ratio),
            fmt(record.price_to_book),
            fmt(record.ev_to_ebitda),
            fmt(record.return_on_equity),
        );
    }
}
