//! Basic example querying trees around Rota (Cádiz, Spain).
//!
//! Run with: cargo run --example basic -- [min_lat,min_lon,max_lat,max_lon]

use osmtrees::{fetch, ClientConfig, Error, FeatureKind, FeatureRequest, OverpassClient};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let bbox = env::args()
        .nth(1)
        .unwrap_or_else(|| "36.61,-6.41,36.64,-6.33".to_string());

    let client = OverpassClient::new(ClientConfig::default())?;

    for kind in [FeatureKind::Tree, FeatureKind::Stump] {
        let request = FeatureRequest::new(bbox.as_str()).with_limit(20);
        match fetch(&client, kind, &request).await {
            Ok(batch) => {
                println!(
                    "{}s: {} found, {} failed to map",
                    kind,
                    batch.features.len(),
                    batch.failed
                );
                println!("{:-<50}", "");
                for feature in &batch.features {
                    println!(
                        "{:<20} {:>10.5} {:>10.5}  {}",
                        feature.id(),
                        feature.lat(),
                        feature.lon(),
                        feature.species().unwrap_or("-")
                    );
                }
                println!();
            }
            Err(Error::InvalidBbox(e)) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
            Err(e) => {
                println!("{}s: error - {}", kind, e);
            }
        }
    }

    Ok(())
}
