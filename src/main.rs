use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{ArgGroup, Parser};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use tourcap::catalog::{validate_all_tour_definitions, TourDefinition};
use tourcap::generate::{print_summary, GeneratorOptions, ScreenshotGenerator};
use tourcap::tours;

/// Generate guided-tour screenshots against a running instance of the
/// application. Exactly one of --tour/--all selects what to generate.
#[derive(Parser)]
#[clap(author, version, about)]
#[clap(group(ArgGroup::new("selection").required(true).args(["tour", "all"])))]
struct Cli {
    /// Generate screenshots for a single tour id
    #[clap(long, value_name = "ID")]
    tour: Option<String>,
    /// Generate screenshots for every tour in the catalog
    #[clap(long)]
    all: bool,
    /// Show the browser window instead of running headless
    #[clap(long)]
    no_headless: bool,
    /// Port of the running application server
    #[clap(long, default_value_t = 3002)]
    port: u16,
    /// Delay between steps, in milliseconds
    #[clap(long, default_value_t = 1000)]
    delay: u64,
    /// Load the tour catalog from a YAML file instead of the built-ins
    #[clap(long, value_name = "FILE")]
    catalog: Option<String>,
    /// Root directory for generated screenshots
    #[clap(long, default_value = "public/tours")]
    out_dir: PathBuf,
    #[clap(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let catalog = match &args.catalog {
        Some(path) => tours::load_catalog(path)?,
        None => tours::TOUR_DEFINITIONS.clone(),
    };

    let warnings = validate_all_tour_definitions(&catalog);
    if !warnings.is_empty() {
        info!(
            "Catalog validation produced {} warnings (advisory only)",
            warnings.len()
        );
    }

    let selected: Vec<TourDefinition> = if args.all {
        catalog.clone()
    } else if let Some(id) = &args.tour {
        let tour = tours::find_tour(&catalog, id).ok_or_else(|| {
            let known: Vec<&str> = catalog.iter().map(|t| t.id.as_str()).collect();
            anyhow::anyhow!("unknown tour id '{}'; known ids: {}", id, known.join(", "))
        })?;
        vec![tour.clone()]
    } else {
        // clap's selection group enforces one of the two.
        anyhow::bail!("one of --tour or --all is required");
    };

    let opts = GeneratorOptions {
        base_url: format!("http://localhost:{}", args.port),
        out_dir: args.out_dir.clone(),
        headless: !args.no_headless,
        step_delay: Duration::from_millis(args.delay),
    };

    info!("Target application: {}", opts.base_url);
    info!("Output directory: {}", opts.out_dir.display());

    let mut generator = ScreenshotGenerator::launch(opts).await?;
    let outcome = generator.generate_all(&selected).await;
    // The browser is closed on the error path too.
    if let Err(error) = generator.close().await {
        warn!("Browser close failed: {}", error);
    }
    let results = outcome?;

    print_summary(&results);
    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!(
            "tungstenite=warn,reqwest=warn,{}",
            log_level
        )))
        .without_time()
        .init();
}
