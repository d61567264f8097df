use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use ratatui::widgets::TableState;
use tracing::debug;

use crate::analysis::{self, StockAssessment};
use crate::database::WatchlistStore;
use crate::models::StockRecord;

/// Application views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Listing,
    Watchlist,
    Detail,
}

/// Keyboard focus: plain navigation, the search prompt, or the note editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Note,
}

/// Sortable listing columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Code,
    Name,
    Sector,
    ClosingPrice,
    MarketCap,
    PeRatio,
    PriceToBook,
    EvToEbitda,
    ReturnOnEquity,
}

impl SortField {
    pub fn next(self) -> SortField {
        match self {
            SortField::Code => SortField::Name,
            SortField::Name => SortField::Sector,
            SortField::Sector => SortField::ClosingPrice,
            SortField::ClosingPrice => SortField::MarketCap,
            SortField::MarketCap => SortField::PeRatio,
            SortField::PeRatio => SortField::PriceToBook,
            SortField::PriceToBook => SortField::EvToEbitda,
            SortField::EvToEbitda => SortField::ReturnOnEquity,
            SortField::ReturnOnEquity => SortField::Code,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortField::Code => "Code",
            SortField::Name => "Name",
            SortField::Sector => "Sector",
            SortField::ClosingPrice => "Close",
            SortField::MarketCap => "MCap",
            SortField::PeRatio => "P/E",
            SortField::PriceToBook => "P/B",
            SortField::EvToEbitda => "EV/EBITDA",
            SortField::ReturnOnEquity => "ROE",
        }
    }

    fn numeric_value(self, record: &StockRecord) -> Option<f64> {
        match self {
            SortField::ClosingPrice => record.closing_price,
            SortField::MarketCap => record.market_cap,
            SortField::PeRatio => record.pe_ratio,
            SortField::PriceToBook => record.price_to_book,
            SortField::EvToEbitda => record.ev_to_ebitda,
            SortField::ReturnOnEquity => record.return_on_equity,
            _ => None,
        }
    }
}

/// One row of the listing/watchlist table. Watchlist entries whose code has
/// dropped out of the dataset carry no record index.
#[derive(Debug, Clone)]
pub struct VisibleRow {
    pub code: String,
    pub record_idx: Option<usize>,
}

/// Everything the detail view needs for one stock.
pub struct StockDetail {
    pub record: StockRecord,
    pub assessment: StockAssessment,
    pub in_watchlist: bool,
    pub note: String,
}

/// Main application state
pub struct App {
    records: Vec<StockRecord>,
    store: WatchlistStore,
    matcher: SkimMatcherV2,

    pub view: AppView,
    pub input_mode: InputMode,
    pub table_state: TableState,

    pub search_query: String,
    pub sector_filter: Option<String>,
    sectors: Vec<String>,
    pub sort_field: SortField,
    pub sort_descending: bool,

    pub detail: Option<StockDetail>,
    pub note_buffer: String,
    pub watchlist: Vec<String>,
    pub status: String,

    // Guards against a stale detail computation overwriting a newer request.
    detail_seq: u64,
    should_quit: bool,
}

impl App {
    pub async fn new(records: Vec<StockRecord>, store: WatchlistStore) -> Result<Self> {
        let watchlist = store.codes().await?;
        let sectors = StockRecord::sectors(&records);
        let status = format!("{} stocks loaded across {} sectors", records.len(), sectors.len());

        let mut table_state = TableState::default();
        table_state.select(Some(0));

        Ok(Self {
            records,
            store,
            matcher: SkimMatcherV2::default(),
            view: AppView::Listing,
            input_mode: InputMode::Normal,
            table_state,
            search_query: String::new(),
            sector_filter: None,
            sectors,
            sort_field: SortField::Code,
            sort_descending: false,
            detail: None,
            note_buffer: String::new(),
            watchlist,
            status,
            detail_seq: 0,
            should_quit: false,
        })
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn record(&self, idx: usize) -> &StockRecord {
        &self.records[idx]
    }

    /// Rows of the current table view: filtered, searched and sorted.
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        match self.view {
            AppView::Watchlist => self
                .watchlist
                .iter()
                .map(|code| VisibleRow {
                    code: code.clone(),
                    record_idx: self.records.iter().position(|r| &r.code == code),
                })
                .collect(),
            _ => {
                let mut indices: Vec<usize> = (0..self.records.len())
                    .filter(|&i| match &self.sector_filter {
                        Some(sector) => &self.records[i].sector == sector,
                        None => true,
                    })
                    .collect();

                if self.search_query.is_empty() {
                    self.sort_indices(&mut indices);
                } else {
                    // Search ranks by fuzzy match quality instead of columns.
                    let mut scored: Vec<(i64, usize)> = indices
                        .into_iter()
                        .filter_map(|i| {
                            let record = &self.records[i];
                            let haystack = format!("{} {}", record.code, record.name);
                            self.matcher
                                .fuzzy_match(&haystack, &self.search_query)
                                .map(|score| (score, i))
                        })
                        .collect();
                    scored.sort_by(|a, b| b.0.cmp(&a.0));
                    indices = scored.into_iter().map(|(_, i)| i).collect();
                }

                indices
                    .into_iter()
                    .map(|i| VisibleRow {
                        code: self.records[i].code.clone(),
                        record_idx: Some(i),
                    })
                    .collect()
            }
        }
    }

    fn sort_indices(&self, indices: &mut [usize]) {
        indices.sort_by(|&a, &b| {
            let ra = &self.records[a];
            let rb = &self.records[b];
            let ordering = match self.sort_field {
                SortField::Code => ra.code.cmp(&rb.code),
                SortField::Name => ra.name.to_lowercase().cmp(&rb.name.to_lowercase()),
                SortField::Sector => ra.sector.cmp(&rb.sector).then_with(|| ra.code.cmp(&rb.code)),
                numeric => {
                    let va = numeric.numeric_value(ra).unwrap_or(f64::NEG_INFINITY);
                    let vb = numeric.numeric_value(rb).unwrap_or(f64::NEG_INFINITY);
                    va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
                }
            };
            if self.sort_descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    /// Handle one key event for the current view and input mode.
    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.input_mode {
            InputMode::Search => self.handle_search_key(key.code),
            InputMode::Note => self.handle_note_key(key.code).await?,
            InputMode::Normal => match self.view {
                AppView::Detail => self.handle_detail_key(key.code).await?,
                _ => self.handle_table_key(key.code).await?,
            },
        }
        Ok(())
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.search_query.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.select_first();
            }
            KeyCode::Backspace => {
                self.search_query.pop();
            }
            KeyCode::Char(c) => {
                self.search_query.push(c);
                self.select_first();
            }
            _ => {}
        }
    }

    async fn handle_note_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.status = "Note discarded".to_string();
            }
            KeyCode::Enter => {
                if let Some(detail) = &mut self.detail {
                    self.store.set_note(&detail.record.code, &self.note_buffer).await?;
                    detail.note = self.note_buffer.clone();
                    self.status = format!("Note saved for {}", detail.record.code);
                }
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                self.note_buffer.pop();
            }
            KeyCode::Char(c) => {
                self.note_buffer.push(c);
            }
            _ => {}
        }
        Ok(())
    }

    async fn handle_detail_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Char('b') => {
                self.view = AppView::Listing;
                self.detail = None;
            }
            KeyCode::Char('w') => {
                if let Some(code) = self.detail.as_ref().map(|d| d.record.code.clone()) {
                    self.toggle_watchlist(&code).await?;
                }
            }
            KeyCode::Char('n') => {
                if let Some(detail) = &self.detail {
                    self.note_buffer = detail.note.clone();
                    self.input_mode = InputMode::Note;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn handle_table_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => {
                self.view = if self.view == AppView::Listing {
                    AppView::Watchlist
                } else {
                    AppView::Listing
                };
                self.select_first();
            }
            KeyCode::Down => self.next_item(),
            KeyCode::Up => self.previous_item(),
            KeyCode::Enter => {
                let rows = self.visible_rows();
                if let Some(row) = self.table_state.selected().and_then(|i| rows.get(i)) {
                    if row.record_idx.is_some() {
                        let code = row.code.clone();
                        self.open_detail(code).await?;
                    } else {
                        self.status = format!("{} is not in the loaded dataset", row.code);
                    }
                }
            }
            KeyCode::Char('w') => {
                let rows = self.visible_rows();
                if let Some(row) = self.table_state.selected().and_then(|i| rows.get(i)) {
                    let code = row.code.clone();
                    self.toggle_watchlist(&code).await?;
                }
            }
            KeyCode::Char('s') => {
                self.sort_field = self.sort_field.next();
                self.status = format!("Sorted by {}", self.sort_field.label());
            }
            KeyCode::Char('r') => {
                self.sort_descending = !self.sort_descending;
            }
            KeyCode::Char('f') => self.cycle_sector_filter(),
            KeyCode::Char('/') => {
                self.search_query.clear();
                self.input_mode = InputMode::Search;
            }
            KeyCode::Esc => {
                self.search_query.clear();
                self.sector_filter = None;
            }
            _ => {}
        }
        Ok(())
    }

    /// Compute and show the detail view for `code`.
    ///
    /// The store round-trips await in between; if the user has already asked
    /// for another stock by the time they finish, this result is stale and
    /// gets dropped instead of being applied to the newer view.
    async fn open_detail(&mut self, code: String) -> Result<()> {
        self.detail_seq += 1;
        let seq = self.detail_seq;

        let Some(record) = self
            .records
            .iter()
            .find(|r| r.code.eq_ignore_ascii_case(&code))
            .cloned()
        else {
            self.status = format!("stock `{code}` not found in the loaded dataset");
            return Ok(());
        };

        let assessment = match analysis::evaluate(&record.code, &self.records) {
            Ok(assessment) => assessment,
            Err(err) => {
                self.status = err.to_string();
                return Ok(());
            }
        };

        let in_watchlist = self.store.contains(&assessment.code).await?;
        let note = self.store.note(&assessment.code).await?.unwrap_or_default();

        if seq != self.detail_seq {
            debug!(code = %assessment.code, "dropping stale detail result");
            return Ok(());
        }

        self.status = format!("Showing {} ({})", assessment.name, assessment.sector);
        self.detail = Some(StockDetail {
            record,
            assessment,
            in_watchlist,
            note,
        });
        self.view = AppView::Detail;
        Ok(())
    }

    async fn toggle_watchlist(&mut self, code: &str) -> Result<()> {
        if self.store.contains(code).await? {
            self.store.remove(code).await?;
            self.status = format!("{code} removed from watchlist");
        } else {
            self.store.add(code).await?;
            self.status = format!("{code} added to watchlist");
        }
        self.watchlist = self.store.codes().await?;

        if let Some(detail) = &mut self.detail {
            if detail.record.code == code {
                detail.in_watchlist = self.store.contains(code).await?;
            }
        }
        Ok(())
    }

    fn cycle_sector_filter(&mut self) {
        if self.sectors.is_empty() {
            return;
        }
        self.sector_filter = match &self.sector_filter {
            None => Some(self.sectors[0].clone()),
            Some(current) => {
                let pos = self.sectors.iter().position(|s| s == current);
                match pos {
                    Some(i) if i + 1 < self.sectors.len() => Some(self.sectors[i + 1].clone()),
                    _ => None,
                }
            }
        };
        self.select_first();
        self.status = match &self.sector_filter {
            Some(sector) => format!("Filtering sector: {sector}"),
            None => "Showing all sectors".to_string(),
        };
    }

    fn select_first(&mut self) {
        self.table_state.select(Some(0));
    }

    fn next_item(&mut self) {
        let len = self.visible_rows().len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i + 1 >= len => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn previous_item(&mut self) {
        let len = self.visible_rows().len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }
}
