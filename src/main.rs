use clap::Parser;
use config_manager::SystemConfig;
use ebird_client::EbirdClient;
use species_core::{fetch_top_species, NearbyQuery, SurveyError};
use tracing::{info, warn};

/// Get top bird species from the eBird API within a specified radius.
///
/// Prints the most frequently observed species codes near a point, as an
/// input list for the BirdNET Analyzer.
#[derive(Parser, Debug)]
#[command(name = "ebird-top", version)]
struct Cli {
    /// Your eBird API key
    api_key: String,

    /// Latitude of the location (e.g., 40.7128)
    #[arg(allow_negative_numbers = true)]
    latitude: f64,

    /// Longitude of the location (e.g., -74.0060)
    #[arg(allow_negative_numbers = true)]
    longitude: f64,

    /// Radius to search within (in miles)
    radius: i64,

    /// Number of top bird species to fetch
    #[arg(allow_negative_numbers = true)]
    top_n: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = SystemConfig::load()?;
    let client = EbirdClient::new(config.ebird, cli.api_key)?;

    let query = NearbyQuery {
        latitude: cli.latitude,
        longitude: cli.longitude,
        radius_miles: cli.radius,
        max_results: cli.top_n,
    };

    let top_birds = match fetch_top_species(&client, &query, cli.top_n).await {
        Ok(species) => species,
        Err(err @ SurveyError::UpstreamStatus(_)) => {
            // Upstream rejections degrade to an empty list at the CLI
            // surface; the status code still reaches the user.
            warn!("eBird request failed: {err}");
            println!("{err}");
            Vec::new()
        }
        // Transport-level faults (DNS, refused connection, timeout) abort
        // the run with a nonzero exit.
        Err(err) => return Err(err.into()),
    };

    info!("Ranked {} species", top_birds.len());

    println!("Top Birds for BirdNET Analyzer:");
    for bird in &top_birds {
        println!("{bird}");
    }

    Ok(())
}
