use clap::Parser;
use colored::*;
use env_logger::Builder;
use itertools::Itertools;
use log::{info, LevelFilter};
use prettytable::{row, Table};
use std::path::PathBuf;

use sievedata::model::{ScaleKind, SieveModel};
use sievedata::process::{run_pipeline, SieveConfig, SieveError};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder containing the four input files
    #[arg(short, long = "data_dir")]
    data_dir: String,

    /// Study name, e.g. VTN502
    #[arg(short, long)]
    study: String,

    /// Protein the alignment covers, e.g. gag
    #[arg(short, long)]
    protein: String,

    /// Reference (vaccine insert) name, e.g. MRK
    #[arg(short, long)]
    reference: String,

    /// Distance method used in the file names
    #[arg(long = "distance_metric", default_value = "vxmatch_site")]
    distance_metric: String,

    /// Comma-separated display-position labels to pre-select
    #[arg(long)]
    sites: Option<String>,

    /// Write a per-site CSV (entropies + statistics of the chosen metric)
    #[arg(short, long)]
    output: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Builder::new().filter_level(LevelFilter::Info).init();

    let args = Args::parse();
    let config = SieveConfig {
        data_dir: PathBuf::from(&args.data_dir),
        study: args.study.clone(),
        protein: args.protein.clone(),
        reference: args.reference.clone(),
        distance_metric: args.distance_metric.clone(),
        selected_sites: args
            .sites
            .as_deref()
            .map(|s| s.split(',').map(|t| t.trim().to_string()).collect())
            .unwrap_or_default(),
    };

    println!(
        "{}",
        format!("Sieve analysis ingest: {} / {}", args.study, args.protein).green()
    );

    let model = run_pipeline(&config)?;
    print_summary(&model, &config);

    if let Some(output) = &args.output {
        write_site_table(&model, &config.distance_metric, output)?;
        info!("per-site table written to {}", output);
    }

    Ok(())
}

fn print_summary(model: &SieveModel, config: &SieveConfig) {
    let mut table = Table::new();
    table.add_row(row!["Reference", model.reference.id]);
    table.add_row(row!["Alignment positions", model.alignment_length()]);
    table.add_row(row!["Participants", model.participants.len()]);
    table.add_row(row!["Vaccine sequences", model.vaccine_count]);
    table.add_row(row!["Placebo sequences", model.placebo_count]);
    table.add_row(row![
        "Distance methods",
        model.distances.keys().sorted().join(", ")
    ]);
    if let Some(per_stat) = model.site_stats.get(&config.distance_metric) {
        let described = per_stat
            .keys()
            .sorted()
            .map(|stat| match model.scale_for(&config.distance_metric, stat) {
                Some(scale) if scale.kind == ScaleKind::Probability => {
                    format!("{} (probability)", stat)
                }
                _ => stat.clone(),
            })
            .join(", ");
        table.add_row(row![format!("Statistics [{}]", config.distance_metric), described]);
    }
    if !model.selected_sites.is_empty() {
        let labels = model
            .selected_sites
            .iter()
            .filter_map(|&i| model.position_map.label_of(i))
            .join(", ");
        table.add_row(row!["Selected sites", labels]);
    }
    table.printstd();
}

/// One row per alignment position: display label, the three entropies and
/// every statistic of the chosen distance metric.
fn write_site_table(model: &SieveModel, metric: &str, path: &str) -> Result<(), SieveError> {
    let stats: Vec<&String> = model
        .site_stats
        .get(metric)
        .map(|per_stat| per_stat.keys().sorted().collect())
        .unwrap_or_default();

    let mut writer = csv::WriterBuilder::new().from_path(path)?;
    let mut header = vec![
        "display_position".to_string(),
        "entropy_full".to_string(),
        "entropy_vaccine".to_string(),
        "entropy_placebo".to_string(),
    ];
    header.extend(stats.iter().map(|s| s.to_string()));
    writer.write_record(&header)?;

    for (i, label) in model.position_map.labels().iter().enumerate() {
        let mut record = vec![label.clone()];
        for series in [
            &model.entropies.full,
            &model.entropies.vaccine,
            &model.entropies.placebo,
        ] {
            record.push(series.get(i).map(|v| v.to_string()).unwrap_or_default());
        }
        for stat in &stats {
            let value = model
                .stat_values(metric, stat)
                .and_then(|values| values.get(i))
                .map(|v| v.to_string())
                .unwrap_or_default();
            record.push(value);
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
