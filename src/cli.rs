use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::EngineConfig;
use crate::geometry::Rect;
use crate::logging::init_logging;
use crate::simulate::{Renderer, Scene, Stroke, Update};
use crate::trigger::SuspendTrigger;

#[derive(Parser)]
#[command(name = "resumable")]
#[command(about = "Resumable - suspendable nested-loop traversal engine", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides RESUMABLE_CONFIG_PATH)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum nesting depth of a pass (overrides config file and env vars)
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Draw a synthetic tiled scene with suspensions and report the result
    Simulate {
        /// Tile columns
        #[arg(long, default_value = "8")]
        columns: usize,

        /// Tile rows
        #[arg(long, default_value = "6")]
        rows: usize,

        /// Tile edge length in pixels
        #[arg(long, default_value = "32")]
        tile_size: i32,

        /// Items per tile
        #[arg(long, default_value = "16")]
        items: usize,

        /// Features per item
        #[arg(long, default_value = "256")]
        features: usize,

        /// Features between two suspension checks (power of two)
        #[arg(long, default_value = "128")]
        sample_period: usize,

        /// Time budget per update in milliseconds (overrides config)
        #[arg(long)]
        budget_ms: Option<u64>,

        /// Give up after this many updates
        #[arg(long, default_value = "100000")]
        max_updates: usize,

        /// Invalidate a rectangle "left,top,right,bottom" after the first update
        #[arg(long, value_parser = parse_rect)]
        invalidate: Vec<Rect>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective engine configuration as JSON
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with explicit arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    init_logging(cli.json_logs);

    let budget_override = match &cli.command {
        Commands::Simulate { budget_ms, .. } => *budget_ms,
        Commands::Config => None,
    };

    // Load before running anything so config errors surface first
    let config = EngineConfig::builder()
        .config_path(cli.config.clone())
        .max_depth(cli.max_depth)
        .budget_ms(budget_override)
        .build()
        .context("failed to load engine configuration")?;

    match cli.command {
        Commands::Config => {
            let rendered = serde_json::to_string_pretty(&config)?;
            println!("{}", rendered);
        }

        Commands::Simulate {
            columns,
            rows,
            tile_size,
            items,
            features,
            sample_period,
            budget_ms: _,
            max_updates,
            invalidate,
            json,
        } => {
            if !sample_period.is_power_of_two() {
                anyhow::bail!("--sample-period must be a power of two, got {}", sample_period);
            }
            if columns == 0 || rows == 0 {
                anyhow::bail!("the scene needs at least one tile");
            }

            let scene = Scene {
                columns,
                rows,
                tile_size,
                items,
                features,
                sample_period,
            };
            let expected = scene.stroke_count();
            let reference = uninterrupted_strokes(&scene, &config)?;
            let trigger = Rc::new(SuspendTrigger::from_config(&config.trigger));
            let mut renderer = Renderer::new(scene, config, trigger);

            let mut updates = 0;
            if !invalidate.is_empty() {
                updates += 1;
                if renderer.update()? != Update::Done {
                    for rect in &invalidate {
                        renderer.invalidate(*rect);
                    }
                }
            }
            let mut report = renderer
                .run_to_completion(max_updates.saturating_sub(updates))
                .context("simulation failed")?;
            report.updates += updates;

            // Invalidated tiles are drawn twice; compare the sets then
            let matches = if invalidate.is_empty() {
                renderer.strokes() == reference.as_slice()
            } else {
                let mut drawn = renderer.strokes().to_vec();
                drawn.sort_unstable();
                drawn.dedup();
                drawn == reference
            };

            if json {
                let output = serde_json::json!({
                    "report": report,
                    "matches_uninterrupted": matches,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Updates: {}", report.updates);
                println!("Suspensions: {}", report.suspensions);
                println!("Restarts: {}", report.restarts);
                println!("Strokes: {} ({} unique, {} in scene)", report.strokes, report.unique_strokes, expected);
                println!("Complete: {}", report.complete);
                println!("Matches uninterrupted run: {}", matches);
                if report.aborted {
                    println!("Aborted: nesting exceeded max_depth");
                }
            }

            if !report.complete {
                anyhow::bail!("scene not completed after {} updates", report.updates);
            }
            if !matches {
                anyhow::bail!("suspended run diverged from the uninterrupted run");
            }
        }
    }

    Ok(())
}

/// Strokes of the scene drawn in one update, sorted (tile-major order).
fn uninterrupted_strokes(scene: &Scene, config: &EngineConfig) -> Result<Vec<Stroke>> {
    let mut renderer = Renderer::new(
        scene.clone(),
        config.clone(),
        Rc::new(SuspendTrigger::default()),
    );
    renderer.update().context("reference run failed")?;
    Ok(renderer.strokes().to_vec())
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<i32> = s
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid rectangle '{}': {}", s, e))?;

    match parts.as_slice() {
        &[left, top, right, bottom] => Ok(Rect::new(left, top, right, bottom)),
        _ => Err(format!("expected left,top,right,bottom, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rect() {
        assert_eq!(parse_rect("1, 2,30,40"), Ok(Rect::new(1, 2, 30, 40)));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("a,b,c,d").is_err());
    }

    #[test]
    fn test_simulate_arguments() {
        let cli = Cli::parse_from([
            "resumable",
            "--max-depth",
            "5",
            "simulate",
            "--columns",
            "2",
            "--invalidate",
            "0,0,10,10",
            "--json",
        ]);
        assert_eq!(cli.max_depth, Some(5));
        match cli.command {
            Commands::Simulate {
                columns,
                invalidate,
                json,
                sample_period,
                ..
            } => {
                assert_eq!(columns, 2);
                assert_eq!(invalidate, vec![Rect::new(0, 0, 10, 10)]);
                assert!(json);
                assert_eq!(sample_period, 128);
            }
            Commands::Config => panic!("expected simulate"),
        }
    }
}
