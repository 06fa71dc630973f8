use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use analyst1_core::{Entity, LookupOptions, LookupResult};

use crate::cli::args::LookupArgs;
use crate::config::Analyst1Config;
use crate::integration::Integration;

fn read_input(path: &Path) -> Result<Vec<Entity>> {
    let content = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read entities from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    };
    serde_json::from_str(&content)
        .with_context(|| format!("Input is not a JSON array of entities: {}", path.display()))
}

/// Entities from `--input` followed by positional values, in that order.
pub fn collect_entities(args: &LookupArgs) -> Result<Vec<Entity>> {
    let mut entities = match &args.input {
        Some(path) => read_input(path)?,
        None => Vec::new(),
    };

    for value in &args.values {
        let entity = Entity::parse(value).ok_or_else(|| {
            anyhow::anyhow!(
                "Could not detect the entity type of '{}', use type:value (IPv4, IPv6, domain, hash, email, cve)",
                value
            )
        })?;
        entities.push(entity);
    }

    Ok(entities)
}

/// Look up `entities` and, when asked, expand the details of every hit.
pub async fn execute_lookup(
    integration: &Integration,
    entities: &[Entity],
    options: &LookupOptions,
    with_details: bool,
) -> Result<Vec<LookupResult>> {
    let mut results = integration.do_lookup(entities, options).await?;

    if with_details {
        for result in results.iter_mut().filter(|r| r.entity.entity_type.is_cve() && !r.is_miss()) {
            integration
                .client()
                .expand_in_place(result, options)
                .await
                .with_context(|| format!("Failed to expand details for {}", result.entity.value))?;
        }
    }

    Ok(results)
}

pub fn render_summary(results: &[LookupResult]) -> String {
    results
        .iter()
        .map(|result| {
            let tags = match &result.data {
                Some(data) if !data.summary.is_empty() => data.summary.join(", "),
                Some(_) => "(no tags)".to_string(),
                None => "no results".to_string(),
            };
            format!("{} {}: {}", result.entity.entity_type, result.entity.value, tags)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn run_lookup_command(args: LookupArgs, config: Analyst1Config) -> Result<()> {
    let entities = collect_entities(&args)?;
    let options = config.options.to_lookup_options();
    let integration = Integration::startup(&config.request)?;

    tracing::info!(
        entities = entities.len(),
        match_search = options.do_indicator_match_search,
        "Starting lookup"
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed}] {msg}")?);
    spinner.set_message(format!("Looking up {} entities...", entities.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = execute_lookup(&integration, &entities, &options, args.details).await;
    spinner.finish_and_clear();
    let results = outcome?;

    let hits = results.iter().filter(|r| !r.is_miss()).count();
    tracing::info!(hits, misses = results.len() - hits, "Lookup finished");

    if args.summary {
        println!("{}", render_summary(&results));
    } else {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    Ok(())
}
