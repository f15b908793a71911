// Fidealis Depot - Core Library
// Exposes all modules for use in CLI, web server, and tests

pub mod config;
pub mod error;
pub mod geocode;
pub mod depot;
pub mod collage;
pub mod staging;
pub mod submission;
pub mod workflow;

#[cfg(feature = "server")]
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{DepotError, ErrorKind, Result};
pub use geocode::{Coordinates, GeocodeClient};
pub use depot::{
    BatchOutcome, BatchResult, CreditBalances, DepositedFile, DepotClient, SessionId,
    UploadReport, BATCH_SIZE,
    plan_batches,
};
pub use collage::{build_collage, compose, CollageLayout, Tile};
pub use staging::{plan_collages, stage_photos, CollageGroup, UploadedPhoto};
pub use submission::Submission;
pub use workflow::{AccountStatus, SubmissionReceipt, SubmitFailure, SubmitStage, Workflow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the tracing subscriber shared by both binaries
pub fn init_logging(json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    }
}
