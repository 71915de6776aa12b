// process - rebuild aggregate tables

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use meter_log::core::reader::ReadingLogReader;
use meter_log::models::config_model::MeterConfig;
use meter_log::pipeline::processor::Processor;
use meter_log::utils::shutdown;

pub async fn run(config: &MeterConfig, once: bool) -> anyhow::Result<()> {
    let processor = Processor::new(
        ReadingLogReader::new(&config.paths.readings),
        config.paths.minute_table.clone(),
        config.paths.hour_table.clone(),
    );

    if once {
        let summary = tokio::task::spawn_blocking(move || processor.run_once())
            .await
            .context("aggregation cycle panicked")?
            .context("aggregation cycle failed")?;
        info!(
            "Aggregated {} readings ({} values): {} minute rows, {} hour rows",
            summary.readings, summary.values, summary.minute_rows, summary.hour_rows
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let listener = shutdown::cancel_on_signal(cancel.clone());
    let stats = Arc::new(processor)
        .run_forever(config.processor_period(), cancel.clone())
        .await;
    cancel.cancel();
    listener.await.ok();

    info!("Processor stopped after {} cycles ({} failed)", stats.cycles, stats.failures);
    Ok(())
}
