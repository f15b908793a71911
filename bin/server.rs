// Fidealis Depot - Web Server
// Deposit form over axum

use anyhow::{Context, Result};
use fidealis_depot::web::{build_router, AppState};
use fidealis_depot::{init_logging, Config, Workflow};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    println!("🌐 Fidealis Depot - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("   Set API_URL, API_KEY, ACCOUNT_KEY and GOOGLE_API_KEY");
            std::process::exit(1);
        }
    };
    init_logging(config.log_json);

    let workflow = Workflow::from_config(&config)?;
    println!("✓ Staging directory: {:?}", config.staging_dir);
    println!("✓ Credit product: {}", config.credit_product_id);

    // Create shared state
    let state = AppState {
        workflow: Arc::new(workflow),
        credit_product_id: config.credit_product_id.clone(),
    };

    let app = build_router(state, config.max_upload_bytes);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   Form: http://{}/", config.bind_addr);
    println!("   API:  http://{}/api/credits", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .await
        .context("server stopped unexpectedly")?;

    Ok(())
}
