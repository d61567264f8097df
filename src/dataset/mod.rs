use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::models::StockRecord;

pub mod headers;

pub use headers::{coerce_numeric, HeaderSchema};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset file `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch dataset from `{url}`")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to parse dataset CSV")]
    Csv(#[from] csv::Error),
    #[error("required column `{field}` not found in dataset headers")]
    MissingColumn { field: &'static str },
    #[error("dataset contains no usable rows")]
    Empty,
}

/// Where the listing CSV comes from. The fetch completes before any scoring
/// runs; the engine only ever sees the parsed records.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, DatasetError>;

    fn describe(&self) -> String;
}

/// Dataset on the local filesystem.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DatasetSource for FileSource {
    async fn fetch(&self) -> Result<Vec<u8>, DatasetError> {
        tokio::fs::read(&self.path).await.map_err(|source| DatasetError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Dataset served over HTTP, the way the published spreadsheet is.
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    async fn fetch(&self) -> Result<Vec<u8>, DatasetError> {
        let http_err = |source| DatasetError::Http {
            url: self.url.clone(),
            source,
        };

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?;

        Ok(response.bytes().await.map_err(http_err)?.to_vec())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Pick a source implementation from a path-or-URL string.
pub fn source_for(location: &str) -> Box<dyn DatasetSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpSource::new(location))
    } else {
        Box::new(FileSource::new(location))
    }
}

/// Fetch and parse the full listing dataset.
pub async fn load(source: &dyn DatasetSource) -> Result<Vec<StockRecord>, DatasetError> {
    let bytes = source.fetch().await?;
    let records = parse_csv(&bytes)?;
    info!(
        source = %source.describe(),
        records = records.len(),
        "dataset loaded"
    );
    Ok(records)
}

/// Parse CSV bytes into typed records: resolve the header schema once, then
/// coerce every row through it. Rows without a ticker code are skipped.
///
/// Turkish spreadsheet exports delimit with `;` because `,` is the decimal
/// separator; the delimiter is sniffed from the header line.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<StockRecord>, DatasetError> {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let delimiter = if first_line.contains(&b';') { b';' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let header_row: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let schema = HeaderSchema::resolve(&header_row)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if let Some(record) = schema.record_from_row(&row) {
            records.push(record);
        }
    }

    if records.is_empty() {
        return Err(DatasetError::Empty);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
Kod;Hisse Adı;Sektör;Kapanış(TL);Piyasa Değeri(mn TL);Ödenmiş Sermaye (mn TL);Halka AçıklıkOranı (%);FK;PD/DD;FD/FAVÖK;Özsermaye Karlılığı
GARAN;Garanti Bankasi;Bankacilik;92,5;388500;4200;48,1;4,1;1,45;6,3;33,4
AKBNK;Akbank;Bankacilik;58,9;306280;5200;51,2;4,9;1,21;7,8;28,2
;;;;;;;;;;
THYAO;Turk Hava Yollari;Ulastirma;289,75;399855;1380;50,4;-;1,02;150,2;41,7
";

    fn sample_csv() -> Vec<u8> {
        SAMPLE.as_bytes().to_vec()
    }

    #[test]
    fn parses_records_and_skips_blank_rows() {
        let records = parse_csv(&sample_csv()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].code, "GARAN");
        assert_eq!(records[0].sector, "Bankacilik");
        assert_eq!(records[0].pe_ratio, Some(4.1));
        assert_eq!(records[0].free_float_pct, Some(48.1));
    }

    #[test]
    fn unparseable_ratio_cells_become_missing() {
        let records = parse_csv(&sample_csv()).unwrap();
        let thyao = records.iter().find(|r| r.code == "THYAO").unwrap();
        assert_eq!(thyao.pe_ratio, None);
        // Over-cap values stay in the record; validity is the engine's call.
        assert_eq!(thyao.ev_to_ebitda, Some(150.2));
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let bytes = "Kod,Sektör\n".as_bytes().to_vec();
        assert!(matches!(parse_csv(&bytes), Err(DatasetError::Empty)));
    }

    #[tokio::test]
    async fn file_source_reports_missing_files() {
        let source = FileSource::new("/definitely/not/here.csv");
        let err = load(&source).await.unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}
