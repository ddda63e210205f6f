use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use template_locator::analysis::{BenchmarkRunner, DimensionSummary, SweepSummary};
use template_locator::config::load_config_or_default;
use template_locator::logging::{init_logging, LoggingConfig};
use template_locator::utils::load_image;
use template_locator::{DetectionRegion, LocalizationEngine};

#[derive(Parser)]
#[command(name = "locate")]
#[command(about = "Find every instance of template images inside a scene image")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log verbosity (-v info, -vv debug, -vvv trace); takes precedence
    /// over the levels in --config
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate registered templates in a scene
    Find {
        /// Path to the scene image (screen capture)
        #[arg(short, long)]
        scene: PathBuf,

        /// Template images, registered in the order given
        #[arg(short, long, num_args = 1.., required = true)]
        template: Vec<PathBuf>,

        /// Which templates to search, e.g. 1,0,1
        #[arg(short, long, value_delimiter = ',')]
        mask: Option<Vec<u8>>,

        /// Engine configuration (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file for the detected regions
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score every channel/locator/matcher combination on one placement
    Evaluate {
        /// Path to the scene image
        #[arg(short, long)]
        scene: PathBuf,

        /// Path to the template image
        #[arg(short, long)]
        template: PathBuf,

        /// Expected rectangles as x,y,w,h (repeatable)
        #[arg(short, long)]
        expect: Vec<String>,

        /// Output file for the sweep results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    };

    match cli.command {
        Commands::Find {
            scene,
            template,
            mask,
            config,
            output,
        } => {
            handle_find(&scene, &template, mask, config.as_deref(), output, level)?;
        }
        Commands::Evaluate {
            scene,
            template,
            expect,
            output,
        } => {
            let _guard = init_logging(&LoggingConfig::with_level(level.unwrap_or("warn")))?;
            handle_evaluate(&scene, &template, &expect, output)?;
        }
    }

    Ok(())
}

fn handle_find(
    scene_path: &Path,
    template_paths: &[PathBuf],
    mask: Option<Vec<u8>>,
    config_path: Option<&Path>,
    output: Option<PathBuf>,
    level: Option<&str>,
) -> anyhow::Result<()> {
    let config = load_config_or_default(config_path);
    let logging = match (config_path, level) {
        (Some(_), Some(level)) => config.logging.clone().overriding_level(level),
        (Some(_), None) => config.logging.clone(),
        (None, level) => LoggingConfig::with_level(level.unwrap_or("warn")),
    };
    let _guard = init_logging(&logging)?;

    let mut engine = LocalizationEngine::from_config(&config)?;
    for path in template_paths {
        let image = load_image(path)?;
        let index = engine.register_template(&image);
        log::info!("template {} <- {}", index, path.display());
    }

    let scene = load_image(scene_path)?;
    let mask: Option<Vec<bool>> = mask.map(|m| m.into_iter().map(|v| v != 0).collect());
    let results = engine.localize_all(&scene, mask.as_deref());

    for (index, regions) in results.iter().enumerate() {
        println!("Template {} ({}):", index, template_paths[index].display());
        if regions.is_empty() {
            println!("  not found");
        }
        for region in regions {
            println!(
                "  x={} y={} w={} h={} confidence={:.3}",
                region.x, region.y, region.width, region.height, region.confidence
            );
        }
    }
    println!(
        "Scan took {:.1} ms ({} scene keypoints)",
        engine.last_scan().elapsed_ms,
        engine.last_scan().scene_keypoints
    );

    if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&results)?;
        std::fs::write(output_path, json)?;
        println!("Results saved to file.");
    }

    Ok(())
}

fn handle_evaluate(
    scene_path: &Path,
    template_path: &Path,
    expect: &[String],
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let expected = expect
        .iter()
        .map(|s| parse_rect(s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let scene = load_image(scene_path)?;
    let template = load_image(template_path)?;

    let runner = BenchmarkRunner::new(scene, template, expected);
    println!("Running {} combinations...", runner.selections().len());
    let mut results = runner.run_benchmark();
    results.sort_by(|a, b| b.total_points().total_cmp(&a.total_points()));

    println!(
        "{:<10} {:<30} {:<22} {:>7} {:>9} {:>8} {:>8}",
        "Channel", "Locator", "Matcher", "Found", "Area %", "Points", "ms"
    );
    for result in &results {
        println!(
            "{:<10} {:<30} {:<22} {:>3}/{:<3} {:>9.1} {:>8.2} {:>8.1}",
            result.selection.channel.as_str(),
            result.selection.locator.as_str(),
            result.selection.matcher.as_str(),
            result.report.found_objects,
            result.report.expected_objects,
            result.report.found_area_percent.unwrap_or(0.0),
            result.total_points(),
            result.elapsed_ms
        );
    }

    let summary = SweepSummary::from_results(&results);
    print_summary("Channels", &summary.channels);
    print_summary("Locators", &summary.locators);
    print_summary("Matchers", &summary.matchers);

    if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&results)?;
        std::fs::write(output_path, json)?;
        println!("Sweep results saved to file.");
    }

    Ok(())
}

fn print_summary(title: &str, summaries: &[DimensionSummary]) {
    println!("\n{}:", title);
    for summary in summaries {
        println!(
            "  {:<30} {:>6.2} points ({:.0} ms, {} runs)",
            summary.name,
            summary.mean_points(),
            summary.mean_ms(),
            summary.runs
        );
    }
}

fn parse_rect(text: &str) -> anyhow::Result<DetectionRegion> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("invalid rectangle '{}': {}", text, e))?;
    match values.as_slice() {
        [x, y, w, h] => Ok(DetectionRegion::new(*x, *y, *w, *h, 0.0)),
        _ => Err(anyhow::anyhow!("rectangle '{}' must be x,y,w,h", text)),
    }
}
