use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use osmtrees::{ClientConfig, Feature, FeatureKind, FeatureRequest, OverpassClient};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Arguments shared by the `trees` and `stumps` commands.
#[derive(Args)]
pub struct FetchArgs {
    /// Bounding box as min_lat,min_lon,max_lat,max_lon
    #[arg(long, allow_hyphen_values = true)]
    bbox: String,

    /// Maximum number of results (capped at 1000, lower for large areas)
    #[arg(short, long)]
    limit: Option<i64>,

    /// Overpass server-side timeout setting
    #[arg(short, long)]
    timeout: Option<u32>,

    /// Only return features with this species tag
    #[arg(short, long)]
    species: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON array of records
    Json,
    /// GeoJSON FeatureCollection of points
    Geojson,
    /// One CSV row per record
    Csv,
}

pub async fn run(config: ClientConfig, kind: FeatureKind, args: FetchArgs) -> Result<()> {
    let client = OverpassClient::new(config).context("Failed to create Overpass client")?;

    let mut request = FeatureRequest::new(args.bbox);
    request.limit = args.limit;
    request.timeout = args.timeout;
    request.species = args.species;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Querying Overpass for {}s", kind));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = osmtrees::fetch(&client, kind, &request).await;
    pb.finish_and_clear();
    let batch = result.with_context(|| format!("Failed to fetch {}s", kind))?;
    tracing::debug!(
        processed = batch.processed,
        failed = batch.failed,
        skipped = batch.skipped,
        "Fetched features"
    );

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_features(&batch.features, args.format, BufWriter::new(file))?;
            eprintln!("Output written to: {}", path.display());
        }
        None => write_features(&batch.features, args.format, io::stdout().lock())?,
    }

    eprintln!(
        "{} {}s, {} elements failed to map",
        batch.processed, kind, batch.failed
    );
    Ok(())
}

/// Write records in `format` and flush.
pub fn write_features<W: Write>(features: &[Feature], format: OutputFormat, mut out: W) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, features)?;
            writeln!(out)?;
        }
        OutputFormat::Geojson => {
            let collection: geojson::FeatureCollection =
                osmtrees::geojson::to_feature_collection(features)?;
            serde_json::to_writer_pretty(&mut out, &collection)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut out);
            for feature in features {
                match feature {
                    Feature::Tree(tree) => writer.serialize(tree)?,
                    Feature::Stump(stump) => writer.serialize(stump)?,
                }
            }
            writer.flush()?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmtrees::{Stump, Tree};

    fn trees() -> Vec<Feature> {
        vec![
            Feature::Tree(Tree {
                id: "tree_123".to_string(),
                lat: 36.65,
                lon: -6.35,
                species: Some("Pinus pinea".to_string()),
                height: Some(15.0),
                diameter: None,
                age: None,
                health: None,
                last_updated: None,
            }),
            Feature::Tree(Tree {
                id: "tree_124".to_string(),
                lat: 36.62,
                lon: -6.36,
                species: None,
                height: None,
                diameter: Some(0.4),
                age: Some(30),
                health: Some("good".to_string()),
                last_updated: None,
            }),
        ]
    }

    fn render(features: &[Feature], format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_features(features, format, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_json_output() {
        let out = render(&trees(), OutputFormat::Json);
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json[0]["id"], "tree_123");
        assert_eq!(json[1]["age"], 30);
    }

    #[test]
    fn test_geojson_output() {
        let out = render(&trees(), OutputFormat::Geojson);
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["geometry"]["coordinates"][0], -6.35);
    }

    #[test]
    fn test_csv_output() {
        let out = render(&trees(), OutputFormat::Csv);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "id,lat,lon,species,height,diameter,age,health,last_updated"
        );
        assert!(lines[1].starts_with("tree_123,36.65,-6.35,Pinus pinea,15.0,"));
    }

    #[test]
    fn test_csv_stumps() {
        let stumps = vec![Feature::Stump(Stump {
            id: "stump_1".to_string(),
            lat: 1.0,
            lon: 2.0,
            species: None,
            diameter: None,
            removal_date: None,
            reason: Some("storm_damage".to_string()),
        })];
        let out = render(&stumps, OutputFormat::Csv);
        assert!(out.starts_with("id,lat,lon,species,diameter,removal_date,reason\n"));
        assert!(out.contains("stump_1,1.0,2.0,,,,storm_damage"));
    }
}
