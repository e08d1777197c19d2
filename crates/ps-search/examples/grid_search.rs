use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use crossbeam_channel::unbounded;
use ps_search::*;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

/// Ridge regression stand-in: error is smallest near `alpha = 0.3` with the
/// `cholesky` solver.
struct ToyRegressor;

impl Evaluator for ToyRegressor {
    type Config = Value;
    type Data = [(f64, f64)];
    type Result = BTreeMap<Metric, f64>;
    type Model = String;

    fn evaluate(
        &self,
        config: &Value,
        data: &[(f64, f64)],
    ) -> Result<Evaluation<Self::Result, Self::Model>, EvaluationFailure> {
        let alpha = config["model"]["alpha"]
            .as_f64()
            .ok_or_else(|| EvaluationFailure::new("alpha was not applied"))?;
        let solver = config["model"]["solver"].as_str().unwrap_or("auto");
        if solver == "sag" && alpha < 0.05 {
            return Err(EvaluationFailure::new("sag did not converge"));
        }

        let penalty = if solver == "cholesky" { 0.0 } else { 0.02 };
        let shrink = 1.0 / (1.0 + (alpha.log10() + 0.52).powi(2));
        let sq: f64 = data
            .iter()
            .map(|(x, y)| (y - 2.0 * x * shrink).powi(2))
            .sum::<f64>()
            / data.len() as f64;

        let mut result = BTreeMap::new();
        result.insert(Metric::RootMeanSquaredError, sq.sqrt() + penalty);
        result.insert(Metric::MeanAbsoluteError, sq.sqrt() * 0.8 + penalty);
        Ok(Evaluation::new(result).with_model(Arc::new(format!("ridge({solver}, {alpha:.4})"))))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("ParamSweep grid search example");

    let data: Vec<(f64, f64)> = (0..50).map(|i| (i as f64 / 10.0, i as f64 / 5.0)).collect();
    println!("Generated {} training rows", data.len());

    let parameters = vec![
        Parameter::discrete("solver", ["auto", "cholesky", "sag"])?
            .with_property("model.solver")
            .with_default("auto"),
        Parameter::log("alpha", 0.001, 100.0, 1.0, 10.0)?
            .with_property("model.alpha")
            .with_default(1.0),
    ];
    for parameter in &parameters {
        println!("  {parameter}");
    }

    let config = SearchConfig::new("ridge_sweep", parameters)
        .with_metric(Metric::RootMeanSquaredError)
        .with_metric_set(MetricSet::regression())
        .with_refinement(3, 0.5)
        .with_min_improvement(1e-4)
        .with_parallelism(4)
        .with_history(true);
    println!("Search config:\n{}", config.to_json()?);

    let (tx, rx) = unbounded();
    let driver = SearchDriver::new(config, ToyRegressor, json!({ "model": {} }))?.with_events(tx);

    let listener = thread::spawn(move || {
        let mut improvements = 0;
        for event in rx {
            if let SearchEvent::BestImproved { point, value, .. } = &event {
                improvements += 1;
                println!("  new best {point}: {value:.5}");
            }
        }
        improvements
    });

    let report = driver.run(&data)?;
    drop(driver);
    let improvements = listener.join().unwrap_or(0);

    println!("Status: {:?}", report.status);
    for level in &report.levels {
        println!(
            "  level {}: {} points, {} evaluated, {} failed, {} cached, best {:.5}",
            level.level, level.points, level.evaluated, level.failed, level.cached, level.best_value
        );
    }
    println!(
        "Cache: {} entries, {} hits, {} misses",
        report.cache.entries, report.cache.hits, report.cache.misses
    );
    println!("Best improved {improvements} times");

    match &report.selection {
        Selection::Found(best) => {
            println!("Selected {best}");
            if let Some(model) = best.model() {
                println!("Model: {model}");
            }
        }
        Selection::NoValidConfiguration => println!("No valid configuration found"),
    }

    Ok(())
}
