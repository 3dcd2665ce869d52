//! Tether lab - prints related rows loaded eagerly, lazily, and explicitly.

use tether_lab::{Lab, LabConfig, LabResult, output};
use tether_query::logging;

#[tokio::main]
async fn main() -> miette::Result<()> {
    logging::init();
    run().await?;
    Ok(())
}

async fn run() -> LabResult<()> {
    let config = LabConfig::load()?;
    output::kv("database", &config.database_url);

    let lab = Lab::connect(&config.database_url).await?;

    if config.recreate {
        lab.recreate().await?;
        output::success("Recreated tables");
    }
    if config.seed {
        let report = lab.seed().await?;
        output::success(&format!("Seeded {} rows", report.total()));
    }

    let total = config.scenarios.len();
    for (index, scenario) in config.scenarios.iter().enumerate() {
        output::header(scenario.title());
        output::step(index + 1, total, scenario.as_str());
        for line in scenario.run(&lab).await? {
            output::line(&line);
        }
    }

    Ok(())
}
