use crate::algorithms::matcher::MatcherId;
use crate::algorithms::registry::{FeatureRegistry, LocatorId};
use crate::analysis::evaluation::{evaluate, timing_points, EvaluationReport};
use crate::pipeline::engine::{AlgorithmSelection, LocalizationEngine};
use crate::pipeline::preprocess::ChannelSelector;
use crate::pipeline::types::DetectionRegion;
use crate::utils::geometry::ImageSize;
use instant::Instant;
use opencv::core::Mat;
use opencv::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of one algorithm combination on the benchmark scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub selection: AlgorithmSelection,
    pub regions: Vec<DetectionRegion>,
    pub report: EvaluationReport,
    pub elapsed_ms: f64,
    pub timing_points: f64,
}

impl BenchmarkResult {
    pub fn total_points(&self) -> f64 {
        self.report.points + self.timing_points
    }
}

/// Points and time accumulated by every run sharing one channel, locator
/// or matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSummary {
    pub name: String,
    pub runs: usize,
    pub total_points: f64,
    pub total_ms: f64,
}

impl DimensionSummary {
    pub fn mean_points(&self) -> f64 {
        self.total_points / self.runs as f64
    }

    pub fn mean_ms(&self) -> f64 {
        self.total_ms / self.runs as f64
    }
}

/// Sweep results folded along each dimension, best mean score first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSummary {
    pub channels: Vec<DimensionSummary>,
    pub locators: Vec<DimensionSummary>,
    pub matchers: Vec<DimensionSummary>,
}

impl SweepSummary {
    pub fn from_results(results: &[BenchmarkResult]) -> Self {
        Self {
            channels: tally(results, |r| r.selection.channel.as_str().to_string()),
            locators: tally(results, |r| r.selection.locator.as_str().to_string()),
            matchers: tally(results, |r| r.selection.matcher.as_str().to_string()),
        }
    }
}

fn tally<F>(results: &[BenchmarkResult], key: F) -> Vec<DimensionSummary>
where
    F: Fn(&BenchmarkResult) -> String,
{
    let mut summaries: Vec<DimensionSummary> = Vec::new();
    for result in results {
        let name = key(result);
        match summaries.iter_mut().find(|s| s.name == name) {
            Some(summary) => {
                summary.runs += 1;
                summary.total_points += result.total_points();
                summary.total_ms += result.elapsed_ms;
            }
            None => summaries.push(DimensionSummary {
                name,
                runs: 1,
                total_points: result.total_points(),
                total_ms: result.elapsed_ms,
            }),
        }
    }
    summaries.sort_by(|a, b| b.mean_points().total_cmp(&a.mean_points()));
    summaries
}

/// Sweeps channel x locator x compatible matcher over one scene/template
/// pair with known template placements.
pub struct BenchmarkRunner {
    pub scene: Mat,
    pub template: Mat,
    pub expected: Vec<DetectionRegion>,
    pub channels: Vec<ChannelSelector>,
    pub locators: Vec<LocatorId>,
}

impl BenchmarkRunner {
    pub fn new(scene: Mat, template: Mat, expected: Vec<DetectionRegion>) -> Self {
        Self {
            scene,
            template,
            expected,
            channels: ChannelSelector::ALL.to_vec(),
            locators: LocatorId::ALL.to_vec(),
        }
    }

    pub fn with_channels(mut self, channels: Vec<ChannelSelector>) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_locators(mut self, locators: Vec<LocatorId>) -> Self {
        self.locators = locators;
        self
    }

    /// Every selection the sweep will run, in order.
    pub fn selections(&self) -> Vec<AlgorithmSelection> {
        let mut selections = Vec::new();
        for channel in &self.channels {
            for &locator in &self.locators {
                for matcher in MatcherId::compatible_with(locator.descriptor_kind()) {
                    selections.push(AlgorithmSelection::new(locator, matcher, channel.clone()));
                }
            }
        }
        selections
    }

    /// Run the sweep. Backends are built once and reused across runs.
    pub fn run_benchmark(&self) -> Vec<BenchmarkResult> {
        let scene_size = ImageSize::new(self.scene.cols(), self.scene.rows());
        let mut registry = FeatureRegistry::new();
        let mut results = Vec::new();

        for selection in self.selections() {
            let mut engine = LocalizationEngine::with_registry(selection.clone(), registry);

            let start = Instant::now();
            engine.register_template(&self.template);
            let regions = engine
                .localize_all(&self.scene, None)
                .into_iter()
                .next()
                .unwrap_or_default();
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            let report = evaluate(&regions, &self.expected, scene_size);
            log::info!(
                "{} / {} / {}: {} regions, {:.2} points in {:.1} ms",
                selection.channel,
                selection.locator,
                selection.matcher,
                regions.len(),
                report.points,
                elapsed_ms
            );

            results.push(BenchmarkResult {
                selection,
                regions,
                report,
                elapsed_ms,
                timing_points: timing_points(elapsed_ms),
            });
            registry = engine.into_registry();
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_pairs_only_compatible_matchers() {
        let runner = BenchmarkRunner::new(Mat::default(), Mat::default(), Vec::new())
            .with_channels(vec![ChannelSelector::Grayscale, ChannelSelector::Red])
            .with_locators(vec![LocatorId::Orb, LocatorId::Sift]);

        let selections = runner.selections();

        // ORB: 2 binary matchers, SIFT: 4 float matchers, for each channel.
        assert_eq!(selections.len(), 12);
        assert!(selections.iter().all(AlgorithmSelection::is_compatible));
        assert_eq!(selections[0].channel, ChannelSelector::Grayscale);
        assert_eq!(selections[11].channel, ChannelSelector::Red);
    }

    fn run(selection: AlgorithmSelection, points: f64, elapsed_ms: f64) -> BenchmarkResult {
        BenchmarkResult {
            selection,
            regions: Vec::new(),
            report: EvaluationReport {
                found_objects: 0,
                expected_objects: 1,
                per_object_percent: vec![0.0],
                found_area_percent: Some(0.0),
                false_area_percent: 0.0,
                points,
            },
            elapsed_ms,
            timing_points: 0.0,
        }
    }

    #[test]
    fn test_summary_folds_each_dimension() {
        let orb = |channel| AlgorithmSelection::new(LocatorId::Orb, MatcherId::BruteForceHamming, channel);
        let results = vec![
            run(orb(ChannelSelector::Grayscale), 4.0, 30.0),
            run(orb(ChannelSelector::Red), 8.0, 50.0),
            run(
                AlgorithmSelection::new(LocatorId::Sift, MatcherId::FlannBased, ChannelSelector::Red),
                2.0,
                70.0,
            ),
        ];

        let summary = SweepSummary::from_results(&results);

        let names: Vec<&str> = summary.channels.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["R", "Grayscale"]);
        assert_eq!(summary.channels[0].runs, 2);
        assert!((summary.channels[0].mean_points() - 5.0).abs() < 1e-9);
        assert!((summary.channels[0].mean_ms() - 60.0).abs() < 1e-9);

        assert_eq!(summary.locators[0].name, "ORB");
        assert!((summary.locators[0].total_points - 12.0).abs() < 1e-9);
        assert_eq!(summary.matchers.len(), 2);
        assert_eq!(summary.matchers[1].name, "FLANNBASED");
    }
}
