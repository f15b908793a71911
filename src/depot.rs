// 🔏 Deposit Service Client - login, credits, batched deposits
// The service exposes a single endpoint; the `call` parameter selects the operation

use crate::error::{DepotError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SERVICE: &str = "depot";

/// Maximum number of files carried by one `setDeposit` request
pub const BATCH_SIZE: usize = 12;

// ============================================================================
// SESSION & CREDITS
// ============================================================================

/// Opaque `PHPSESSID` returned by login, valid for one page interaction
#[derive(Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        SessionId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionId(..)")
    }
}

/// Remaining credits per product, as reported at `fetched_at`
#[derive(Debug, Clone, Serialize)]
pub struct CreditBalances {
    pub balances: BTreeMap<String, i64>,
    pub fetched_at: DateTime<Utc>,
}

impl CreditBalances {
    pub fn quantity(&self, product_id: &str) -> Option<i64> {
        self.balances.get(product_id).copied()
    }
}

fn session_from_login(body: &Value) -> Result<SessionId> {
    match body.get("PHPSESSID") {
        Some(Value::String(id)) if !id.is_empty() => Ok(SessionId::new(id.clone())),
        Some(Value::Number(n)) => Ok(SessionId::new(n.to_string())),
        _ => Err(DepotError::Business(
            "login response carries no PHPSESSID".to_string(),
        )),
    }
}

/// Quantity can arrive as a JSON number or a numeric string; only whole values count
fn quantity_of(entry: &Value) -> Option<i64> {
    match entry.get("quantity")? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole))
        }
        _ => None,
    }
}

fn whole(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn credits_from_body(body: &Value) -> Result<BTreeMap<String, i64>> {
    let map = body
        .as_object()
        .ok_or_else(|| DepotError::parse(SERVICE, "credit response is not an object"))?;

    let mut balances = BTreeMap::new();
    for (product_id, entry) in map {
        match quantity_of(entry) {
            Some(quantity) => {
                balances.insert(product_id.clone(), quantity);
            }
            None => warn!(product_id = %product_id, "credit entry without usable quantity"),
        }
    }
    Ok(balances)
}

// ============================================================================
// UPLOAD REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DepositedFile {
    pub name: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BatchResult {
    Accepted { status: u16 },
    Rejected { status: u16 },
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// 1-based batch number
    pub index: usize,
    pub files: Vec<DepositedFile>,
    pub result: BatchResult,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    pub batches: Vec<BatchOutcome>,
}

impl UploadReport {
    pub fn all_accepted(&self) -> bool {
        self.batches
            .iter()
            .all(|b| matches!(b.result, BatchResult::Accepted { .. }))
    }

    pub fn failed_batches(&self) -> Vec<&BatchOutcome> {
        self.batches
            .iter()
            .filter(|b| !matches!(b.result, BatchResult::Accepted { .. }))
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.batches.iter().map(|b| b.files.len()).sum()
    }
}

// ============================================================================
// FORM ASSEMBLY
// ============================================================================

/// Split an ordered file list into consecutive batches of at most `BATCH_SIZE`
pub fn plan_batches(files: &[PathBuf]) -> Vec<&[PathBuf]> {
    files.chunks(BATCH_SIZE).collect()
}

/// A file ready to be deposited: base name plus raw bytes
#[derive(Debug, Clone)]
pub struct PreparedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PreparedFile {
    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DepotError::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(PreparedFile { name, bytes })
    }

    pub fn sha256(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }
}

/// Form fields of one `setDeposit` call; file indices restart at 1 per batch
pub fn deposit_fields(
    api_key: &str,
    session: &SessionId,
    description: &str,
    batch: &[PreparedFile],
) -> Vec<(String, String)> {
    let mut fields = vec![
        ("key".to_string(), api_key.to_string()),
        ("PHPSESSID".to_string(), session.as_str().to_string()),
        ("call".to_string(), "setDeposit".to_string()),
        ("description".to_string(), description.to_string()),
        ("type".to_string(), "deposit".to_string()),
        ("hidden".to_string(), "0".to_string()),
        ("sendmail".to_string(), "1".to_string()),
    ];

    for (idx, file) in batch.iter().enumerate() {
        let n = idx + 1;
        fields.push((format!("filename{}", n), file.name.clone()));
        fields.push((format!("file{}", n), STANDARD.encode(&file.bytes)));
    }

    fields
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct DepotClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    account_key: String,
}

impl DepotClient {
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        account_key: impl Into<String>,
    ) -> Self {
        DepotClient {
            http,
            api_url: api_url.into(),
            api_key: api_key.into(),
            account_key: account_key.into(),
        }
    }

    async fn get_json(&self, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .http
            .get(&self.api_url)
            .query(query)
            .send()
            .await
            .map_err(|e| DepotError::network(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DepotError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| DepotError::parse(SERVICE, e.to_string()))
    }

    /// Open a session from the configured account key
    pub async fn login(&self) -> Result<SessionId> {
        info!("logging in to deposit service");
        let body = self
            .get_json(&[
                ("key", self.api_key.as_str()),
                ("call", "loginUserFromAccountKey"),
                ("accountKey", self.account_key.as_str()),
            ])
            .await?;
        session_from_login(&body)
    }

    /// Fetch remaining credits for every product on the account
    pub async fn credits(&self, session: &SessionId) -> Result<CreditBalances> {
        let body = self
            .get_json(&[
                ("key", self.api_key.as_str()),
                ("PHPSESSID", session.as_str()),
                ("call", "getCredits"),
                ("product_ID", ""),
            ])
            .await?;

        let balances = credits_from_body(&body)?;
        info!(products = balances.len(), "credits fetched");
        Ok(CreditBalances {
            balances,
            fetched_at: Utc::now(),
        })
    }

    /// Deposit `files` in order, one POST per batch of at most `BATCH_SIZE`.
    ///
    /// Every batch is attempted even when an earlier one was refused; nothing
    /// is retried. Every file is read before the first POST, so a file that
    /// cannot be read aborts the upload with nothing sent.
    pub async fn upload(
        &self,
        description: &str,
        files: &[PathBuf],
        session: &SessionId,
    ) -> Result<UploadReport> {
        let mut prepared = Vec::new();
        for batch_paths in plan_batches(files) {
            let mut batch = Vec::with_capacity(batch_paths.len());
            for path in batch_paths {
                batch.push(PreparedFile::read(path).await?);
            }
            prepared.push(batch);
        }

        let mut report = UploadReport::default();

        for (i, batch) in prepared.into_iter().enumerate() {
            let deposited: Vec<DepositedFile> = batch
                .iter()
                .map(|f| DepositedFile {
                    name: f.name.clone(),
                    sha256: f.sha256(),
                })
                .collect();

            let fields = deposit_fields(&self.api_key, session, description, &batch);
            let result = match self.http.post(&self.api_url).form(&fields).send().await {
                Ok(response) if response.status().is_success() => BatchResult::Accepted {
                    status: response.status().as_u16(),
                },
                Ok(response) => BatchResult::Rejected {
                    status: response.status().as_u16(),
                },
                Err(e) => BatchResult::Failed {
                    message: e.to_string(),
                },
            };

            match &result {
                BatchResult::Accepted { status } => {
                    info!(batch = i + 1, files = batch.len(), status, "deposit batch sent")
                }
                other => warn!(batch = i + 1, files = batch.len(), result = ?other, "deposit batch not accepted"),
            }

            report.batches.push(BatchOutcome {
                index: i + 1,
                files: deposited,
                result,
            });
        }

        Ok(report)
    }
}
