use anyhow::{Context, Result};
use lightbnb_search::{PgStore, PropertySearch, ResultLimit, SearchOptions, StoreConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let options: SearchOptions = match args.next() {
        Some(json) => serde_json::from_str(&json).context("Invalid search options JSON")?,
        None => SearchOptions::default(),
    };
    let limit = match args.next() {
        Some(raw) => {
            let n: u32 = raw.parse().context("Limit must be a positive integer")?;
            ResultLimit::new(n).context("Limit must be a positive integer")?
        }
        None => ResultLimit::default(),
    };

    let config = StoreConfig::from_env();
    let store = PgStore::connect(config)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!(
        "Searching properties in {} (limit {})",
        store.config().dbname,
        limit.get()
    );
    let properties = PropertySearch::new()
        .search(&store, &options, limit)
        .await
        .context("Property search failed")?;

    info!("Found {} properties", properties.len());

    for (i, property) in properties.iter().enumerate() {
        println!(
            "{}. {} ({}.{:02} per night)",
            i + 1,
            property.title,
            property.cost_per_night / 100,
            property.cost_per_night % 100
        );
        println!("   {}, {}", property.city, property.province);
        if let Some(rating) = property.average_rating {
            println!("   Rating: {:.2}", rating);
        }
        println!("   ID: {}", property.id);
        println!();
    }

    let json = serde_json::to_string_pretty(&properties)?;
    println!("{}", json);

    Ok(())
}
