// 🔄 Workflow - the three page interactions
// Account status on load, address lookup, and the full submit sequence

use crate::config::Config;
use crate::depot::{DepotClient, UploadReport};
use crate::error::{DepotError, Result};
use crate::geocode::{Coordinates, GeocodeClient};
use crate::staging;
use crate::submission::{Submission, MSG_INCOMPLETE};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub const MSG_LOGIN_FAILED: &str = "Échec de la connexion à l'API.";
pub const MSG_CREDITS_FAILED: &str = "Échec de la récupération des données de crédit.";
pub const MSG_GEOCODE_FAILED: &str =
    "Impossible de générer les coordonnées GPS pour l'adresse fournie.";
pub const MSG_PREPARING: &str = "Préparation de l'envoi...";
pub const MSG_CHECKING: &str = "Vérification des données...";
pub const MSG_SENT: &str = "Données envoyées avec succès !";
pub const MSG_SEND_FAILED: &str = "Échec de l'envoi des données.";

// ============================================================================
// ACCOUNT STATUS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountStatus {
    Credits { quantity: i64 },
    CreditsUnavailable,
    LoginFailed,
}

impl AccountStatus {
    pub fn message(&self) -> String {
        match self {
            AccountStatus::Credits { quantity } => format!("Crédit restant {}", quantity),
            AccountStatus::CreditsUnavailable => MSG_CREDITS_FAILED.to_string(),
            AccountStatus::LoginFailed => MSG_LOGIN_FAILED.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, AccountStatus::Credits { .. })
    }
}

// ============================================================================
// SUBMIT OUTCOME
// ============================================================================

/// Step of the submit sequence where a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStage {
    Validation,
    Login,
    Staging,
    Collage,
    Upload,
}

#[derive(Debug)]
pub struct SubmitFailure {
    pub stage: SubmitStage,
    pub error: DepotError,
}

impl SubmitFailure {
    fn at(stage: SubmitStage) -> impl FnOnce(DepotError) -> SubmitFailure {
        move |error| SubmitFailure { stage, error }
    }

    /// Message shown to the user
    pub fn message(&self) -> String {
        match (self.stage, &self.error) {
            (SubmitStage::Validation, _) => MSG_INCOMPLETE.to_string(),
            (SubmitStage::Login, _) => MSG_LOGIN_FAILED.to_string(),
            (SubmitStage::Staging, DepotError::Business(msg)) => msg.clone(),
            _ => MSG_SEND_FAILED.to_string(),
        }
    }
}

impl std::fmt::Display for SubmitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} step failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for SubmitFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    /// Correlates the log lines of one submit
    pub id: Uuid,
    /// Upload list in the order it was sent
    pub files: Vec<PathBuf>,
    pub collages: usize,
    pub report: UploadReport,
}

impl SubmissionReceipt {
    pub fn message(&self) -> String {
        if self.report.all_accepted() {
            return MSG_SENT.to_string();
        }

        let failed: Vec<String> = self
            .report
            .failed_batches()
            .iter()
            .map(|b| {
                let names: Vec<&str> = b.files.iter().map(|f| f.name.as_str()).collect();
                format!("lot {} ({})", b.index, names.join(", "))
            })
            .collect();
        format!("Envoi incomplet, lots non acceptés : {}", failed.join("; "))
    }
}

// ============================================================================
// WORKFLOW
// ============================================================================

#[derive(Debug, Clone)]
pub struct Workflow {
    depot: DepotClient,
    geocoder: GeocodeClient,
    staging_dir: PathBuf,
    credit_product_id: String,
}

impl Workflow {
    pub fn new(
        depot: DepotClient,
        geocoder: GeocodeClient,
        staging_dir: impl Into<PathBuf>,
        credit_product_id: impl Into<String>,
    ) -> Self {
        Workflow {
            depot,
            geocoder,
            staging_dir: staging_dir.into(),
            credit_product_id: credit_product_id.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = config.http_client()?;
        Ok(Workflow::new(
            DepotClient::new(
                http.clone(),
                &config.api_url,
                &config.api_key,
                &config.account_key,
            ),
            GeocodeClient::new(http, &config.geocode_url, &config.google_api_key),
            &config.staging_dir,
            &config.credit_product_id,
        ))
    }

    /// Log in and read the remaining credits of the configured product
    pub async fn account_status(&self) -> AccountStatus {
        let session = match self.depot.login().await {
            Ok(session) => session,
            Err(e) => {
                warn!(kind = e.kind().name(), error = %e, "deposit login failed");
                return AccountStatus::LoginFailed;
            }
        };

        match self.depot.credits(&session).await {
            Ok(credits) => match credits.quantity(&self.credit_product_id) {
                Some(quantity) => AccountStatus::Credits { quantity },
                None => {
                    warn!(product_id = %self.credit_product_id, "product missing from credits");
                    AccountStatus::CreditsUnavailable
                }
            },
            Err(e) => {
                warn!(kind = e.kind().name(), error = %e, "credit lookup failed");
                AccountStatus::CreditsUnavailable
            }
        }
    }

    /// Geocode an address for the latitude/longitude fields
    pub async fn locate(&self, address: &str) -> Result<Coordinates> {
        let address = address.trim();
        if address.is_empty() {
            return Err(DepotError::Business("address is empty".to_string()));
        }
        self.geocoder.geocode(address).await.map_err(|e| {
            warn!(kind = e.kind().name(), error = %e, "geocoding failed");
            e
        })
    }

    /// Stage photos, add collages and deposit everything under one description.
    ///
    /// Each call opens its own session and creates a new deposit; submitting the
    /// same form twice deposits twice.
    pub async fn submit(
        &self,
        submission: &Submission,
    ) -> std::result::Result<SubmissionReceipt, SubmitFailure> {
        let id = Uuid::new_v4();
        let span = info_span!("submit", submission = %id, photos = submission.photos.len());
        self.run_submit(id, submission).instrument(span).await
    }

    async fn run_submit(
        &self,
        id: Uuid,
        submission: &Submission,
    ) -> std::result::Result<SubmissionReceipt, SubmitFailure> {
        if !submission.is_complete() {
            return Err(SubmitFailure {
                stage: SubmitStage::Validation,
                error: DepotError::Business(MSG_INCOMPLETE.to_string()),
            });
        }

        info!("{}", MSG_PREPARING);
        let session = self
            .depot
            .login()
            .await
            .map_err(SubmitFailure::at(SubmitStage::Login))?;

        let staged = staging::stage_photos(
            &self.staging_dir,
            &submission.client_name,
            &submission.photos,
        )
        .await
        .map_err(SubmitFailure::at(SubmitStage::Staging))?;

        let (files, collages) = staging::with_collages(&self.staging_dir, staged)
            .await
            .map_err(SubmitFailure::at(SubmitStage::Collage))?;

        info!("{}", MSG_CHECKING);
        let report = self
            .depot
            .upload(&submission.description(), &files, &session)
            .await
            .map_err(SubmitFailure::at(SubmitStage::Upload))?;

        info!(
            files = report.file_count(),
            batches = report.batches.len(),
            collages,
            accepted = report.all_accepted(),
            "submission finished"
        );

        Ok(SubmissionReceipt {
            id,
            files,
            collages,
            report,
        })
    }
}
