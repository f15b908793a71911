use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;

// Use library instead of local modules
use fidealis_depot::{init_logging, Config, Submission, UploadedPhoto, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("credits") => run_credits().await?,
        Some("geocode") => run_geocode(&args[2..]).await?,
        Some("deposit") => run_deposit(&args[2..]).await?,
        _ => print_help(),
    }

    Ok(())
}

fn print_help() {
    println!("fidealis-depot {}", fidealis_depot::VERSION);
    println!();
    println!("Usage:");
    println!("  fidealis-depot credits");
    println!("  fidealis-depot geocode <address>");
    println!("  fidealis-depot deposit <client> <address> <latitude> <longitude> <photo>...");
    println!();
    println!("Web form: cargo run --bin depot-server");
}

fn load() -> Result<(Config, Workflow)> {
    let config = Config::from_env().context("loading configuration from environment")?;
    init_logging(config.log_json);
    let workflow = Workflow::from_config(&config)?;
    Ok((config, workflow))
}

async fn run_credits() -> Result<()> {
    let (_, workflow) = load()?;

    let status = workflow.account_status().await;
    if status.is_error() {
        bail!(status.message());
    }
    println!("{}", status.message());
    Ok(())
}

async fn run_geocode(args: &[String]) -> Result<()> {
    let address = args.join(" ");
    if address.trim().is_empty() {
        bail!("usage: fidealis-depot geocode <address>");
    }

    let (_, workflow) = load()?;
    let location = workflow
        .locate(&address)
        .await
        .with_context(|| fidealis_depot::workflow::MSG_GEOCODE_FAILED)?;

    println!("Latitude  {}", location.latitude_text());
    println!("Longitude {}", location.longitude_text());
    Ok(())
}

async fn run_deposit(args: &[String]) -> Result<()> {
    if args.len() < 5 {
        bail!("usage: fidealis-depot deposit <client> <address> <latitude> <longitude> <photo>...");
    }

    let mut photos = Vec::new();
    for path in &args[4..] {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path))?;
        let file_name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        photos.push(UploadedPhoto::new(file_name, bytes));
    }

    let submission = Submission {
        client_name: args[0].clone(),
        address: args[1].clone(),
        latitude: args[2].clone(),
        longitude: args[3].clone(),
        photos,
    };

    let (_, workflow) = load()?;
    let receipt = match workflow.submit(&submission).await {
        Ok(receipt) => receipt,
        Err(failure) => {
            let message = failure.message();
            return Err(anyhow::Error::new(failure).context(message));
        }
    };

    println!("{}", serde_json::to_string_pretty(&receipt)?);
    if !receipt.report.all_accepted() {
        bail!(receipt.message());
    }
    println!("{}", receipt.message());
    Ok(())
}
