// recent - minute buckets over a trailing window

use anyhow::Context;
use chrono::TimeDelta;

use meter_log::core::aggregate::aggregate;
use meter_log::core::constants::TABLE_HEADER;
use meter_log::core::format::BucketWidth;
use meter_log::core::reader::ReadingLogReader;
use meter_log::models::config_model::MeterConfig;

pub async fn run(config: &MeterConfig, minutes: u64, json: bool) -> anyhow::Result<()> {
    let reader = ReadingLogReader::new(&config.paths.readings);
    let window = i64::try_from(minutes)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .with_context(|| format!("window of {minutes} minutes is too large"))?;

    let readings = tokio::task::spawn_blocking(move || reader.load(Some(window)))
        .await?
        .context("cannot read the reading log")?;
    let buckets = aggregate(&readings, BucketWidth::Minute);

    if json {
        for bucket in &buckets {
            println!("{}", serde_json::to_string(bucket)?);
        }
    } else {
        println!("{TABLE_HEADER}");
        for bucket in &buckets {
            println!("{}", bucket.to_csv_row());
        }
    }
    Ok(())
}
