//! Page fetching, run configuration and the JSON/CSV output writers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use foa_core::FoaRecord;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, info_span, Instrument};

pub const CRATE_NAME: &str = "foa-storage";

pub const JSON_FILE_NAME: &str = "foa.json";
pub const CSV_FILE_NAME: &str = "foa.csv";
pub const LIST_DELIMITER: &str = "|";

/// CSV header, in output order. `primary_document` is flattened into two columns.
pub const CSV_COLUMNS: &[&str] = &[
    "source_url",
    "page_variant",
    "opportunity_id",
    "opportunity_number",
    "title",
    "agency",
    "posted_date",
    "close_date",
    "archive_date",
    "funding_instrument",
    "funding_category",
    "opportunity_category",
    "category_explanation",
    "assistance_listings",
    "cost_sharing",
    "primary_document_url",
    "primary_document_kind",
    "tags",
];

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub out_dir: PathBuf,
    pub tag_rules_path: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl IngestConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            user_agent: lookup("FOA_USER_AGENT")
                .unwrap_or_else(|| "foa-ingestor/0.1".to_string()),
            http_timeout_secs: lookup("FOA_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            out_dir: lookup("FOA_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./out")),
            tag_rules_path: lookup("FOA_TAG_RULES")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            log_filter: lookup("FOA_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

impl From<&IngestConfig> for HttpClientConfig {
    fn from(config: &IngestConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.http_timeout_secs),
            user_agent: Some(config.user_agent.clone()),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

/// Single-request HTML fetcher. Timeouts are the only network policy.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .default_headers(headers);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }

    /// Body of a successful response; non-2xx statuses are errors.
    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let span = info_span!("http_fetch", url);
        async {
            let resp = self.client.get(url).send().await?;
            let status = resp.status();
            let final_url = resp.url().to_string();
            if !status.is_success() {
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                    url: final_url,
                });
            }
            let html = resp.text().await?;
            info!(%status, final_url = %final_url, bytes = html.len(), "fetched page");
            Ok(html)
        }
        .instrument(span)
        .await
    }
}

/// Pretty-printed JSON payload: populated keys only, lists as arrays.
pub fn render_json(record: &FoaRecord) -> anyhow::Result<String> {
    let payload = record.payload().context("serializing record")?;
    serde_json::to_string_pretty(&payload).context("rendering json")
}

/// Cells for [`CSV_COLUMNS`], taken from the same payload as the JSON output.
pub fn csv_row(payload: &JsonValue) -> Vec<String> {
    CSV_COLUMNS
        .iter()
        .map(|column| {
            let value = match column.strip_prefix("primary_document_") {
                Some(sub) => payload.get("primary_document").and_then(|d| d.get(sub)),
                None => payload.get(*column),
            };
            value.map(cell_text).unwrap_or_default()
        })
        .collect()
}

fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items
            .iter()
            .map(cell_text)
            .collect::<Vec<_>>()
            .join(LIST_DELIMITER),
        other => other.to_string(),
    }
}

/// Header row plus one data row.
pub fn render_csv(record: &FoaRecord) -> anyhow::Result<Vec<u8>> {
    let payload = record.payload().context("serializing record")?;
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS).context("writing csv header")?;
    writer
        .write_record(csv_row(&payload))
        .context("writing csv row")?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing csv: {}", e.error()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Write `foa.json` and `foa.csv` into `out_dir`, each via temp file + rename.
pub async fn write_outputs(record: &FoaRecord, out_dir: &Path) -> anyhow::Result<OutputPaths> {
    fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let json_path = out_dir.join(JSON_FILE_NAME);
    let mut json = render_json(record)?;
    json.push('\n');
    write_atomically(&json_path, json.as_bytes()).await?;

    let csv_path = out_dir.join(CSV_FILE_NAME);
    write_atomically(&csv_path, &render_csv(record)?).await?;

    Ok(OutputPaths {
        json: json_path,
        csv: csv_path,
    })
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let mut file = fs::File::create(&temp_path)
        .await
        .with_context(|| format!("opening temp output file {}", temp_path.display()))?;
    file.write_all(bytes)
        .await
        .with_context(|| format!("writing temp output file {}", temp_path.display()))?;
    file.flush()
        .await
        .with_context(|| format!("flushing temp output file {}", temp_path.display()))?;
    drop(file);

    if let Err(err) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(err).with_context(|| {
            format!(
                "renaming temp output {} -> {}",
                temp_path.display(),
                path.display()
            )
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use foa_core::{DocumentKind, PageVariant, PrimaryDocument};
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn sample_record() -> FoaRecord {
        let mut record = FoaRecord::new(
            "https://www.grants.gov/search-results-detail/357842",
            PageVariant::Classic,
        );
        record.opportunity_id = Some("357842".to_string());
        record.title = Some("Coastal Resilience, Phase \"B\"".to_string());
        record.close_date = NaiveDate::from_ymd_opt(2025, 7, 15);
        record.assistance_listings = vec!["11.419".to_string(), "11.473".to_string()];
        record.cost_sharing = Some(false);
        record.primary_document = Some(PrimaryDocument {
            url: "https://www.grants.gov/nofo.pdf".to_string(),
            kind: DocumentKind::Pdf,
        });
        record.tags.insert("has_deadline".to_string());
        record.tags.insert("climate_environment".to_string());
        record
    }

    fn read_csv(bytes: &[u8]) -> HashMap<String, String> {
        let mut reader = csv::Reader::from_reader(bytes);
        let headers = reader.headers().expect("headers").clone();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
        assert_eq!(rows.len(), 1);
        headers
            .iter()
            .zip(rows[0].iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn config_defaults_and_overrides() {
        let defaults = IngestConfig::default();
        assert_eq!(defaults.user_agent, "foa-ingestor/0.1");
        assert_eq!(defaults.http_timeout_secs, 30);
        assert_eq!(defaults.out_dir, PathBuf::from("./out"));
        assert_eq!(defaults.tag_rules_path, None);

        let config = IngestConfig::from_lookup(|key| match key {
            "FOA_HTTP_TIMEOUT_SECS" => Some("5".to_string()),
            "FOA_TAG_RULES" => Some("rules/tags.yaml".to_string()),
            "FOA_OUT_DIR" => Some("/tmp/foa".to_string()),
            _ => None,
        });
        assert_eq!(config.http_timeout_secs, 5);
        assert_eq!(config.tag_rules_path, Some(PathBuf::from("rules/tags.yaml")));
        assert_eq!(HttpClientConfig::from(&config).timeout, Duration::from_secs(5));
    }

    #[test]
    fn unparsable_timeout_falls_back_to_default() {
        let config = IngestConfig::from_lookup(|key| {
            (key == "FOA_HTTP_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.http_timeout_secs, 30);
    }

    #[test]
    fn csv_and_json_carry_the_same_values() {
        let record = sample_record();
        let json: JsonValue = serde_json::from_str(&render_json(&record).unwrap()).unwrap();
        let row = read_csv(&render_csv(&record).unwrap());

        assert_eq!(row.len(), CSV_COLUMNS.len());
        for key in ["source_url", "page_variant", "opportunity_id", "title", "close_date"] {
            assert_eq!(row[key], json[key].as_str().unwrap(), "{key}");
        }
        let joined = json["assistance_listings"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect::<Vec<_>>()
            .join("|");
        assert_eq!(row["assistance_listings"], joined);
        assert_eq!(row["tags"], "climate_environment|has_deadline");
        assert_eq!(row["cost_sharing"], "false");
        assert_eq!(json["cost_sharing"], JsonValue::Bool(false));
        assert_eq!(row["primary_document_url"], json["primary_document"]["url"].as_str().unwrap());
        assert_eq!(row["primary_document_kind"], "pdf");
    }

    #[test]
    fn stripped_fields_are_empty_cells_and_missing_keys() {
        let mut record = sample_record();
        record.cost_sharing = None;
        record.primary_document = None;
        let json: JsonValue = serde_json::from_str(&render_json(&record).unwrap()).unwrap();
        let row = read_csv(&render_csv(&record).unwrap());

        assert!(json.get("cost_sharing").is_none());
        assert!(json.get("agency").is_none());
        assert_eq!(row["cost_sharing"], "");
        assert_eq!(row["agency"], "");
        assert_eq!(row["primary_document_kind"], "");
    }

    #[tokio::test]
    async fn outputs_are_written_to_out_dir() {
        let dir = tempdir().expect("tempdir");
        let out_dir = dir.path().join("nested").join("out");
        let record = sample_record();

        let paths = write_outputs(&record, &out_dir).await.expect("write outputs");
        assert_eq!(paths.json, out_dir.join("foa.json"));
        assert!(paths.csv.exists());

        let json = std::fs::read_to_string(&paths.json).unwrap();
        assert!(json.starts_with("{\n  \"source_url\""));
        let parsed: JsonValue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record.payload().unwrap());

        let again = write_outputs(&record, &out_dir).await.expect("overwrite outputs");
        assert_eq!(again, paths);
        let leftovers: Vec<_> = std::fs::read_dir(&out_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
