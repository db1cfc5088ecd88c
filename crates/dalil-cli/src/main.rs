mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dalil-cli")]
#[command(about = "dalil directory location tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a location slug into a typed city, region, or country.
    Resolve { slug: String },
    /// Reverse-geocode a coordinate pair and report the matched location.
    Locate { latitude: f64, longitude: f64 },
    /// Fetch grouped search suggestions for a query.
    Suggest {
        query: String,
        /// Scope business suggestions to one city.
        #[arg(long)]
        city_id: Option<i64>,
        /// Suggest places (cities, regions, countries) instead.
        #[arg(long)]
        places: bool,
    },
    /// Search businesses scoped to a location, broadening on empty results.
    Businesses {
        slug: String,
        #[arg(long, value_delimiter = ',')]
        category_ids: Vec<i64>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Pick the advertisement for a placement at a location.
    Ad {
        /// CATEGORY, TOP, or FOOTER.
        placement: String,
        slug: String,
        #[arg(long)]
        category_id: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = dalil_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Resolve { slug } => commands::run_resolve(&config, &slug).await,
        Commands::Locate {
            latitude,
            longitude,
        } => commands::run_locate(&config, latitude, longitude).await,
        Commands::Suggest {
            query,
            city_id,
            places,
        } => commands::run_suggest(&config, &query, city_id, places).await,
        Commands::Businesses {
            slug,
            category_ids,
            search,
        } => commands::run_businesses(&config, &slug, category_ids, search).await,
        Commands::Ad {
            placement,
            slug,
            category_id,
        } => commands::run_ad(&config, &placement, &slug, category_id).await,
    }
}
