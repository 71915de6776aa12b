// scan-cameras - list working camera indices

use anyhow::bail;

use meter_log::models::config_model::MeterConfig;
use meter_log::vision::camera::scan_cameras;

pub async fn run(config: &MeterConfig, max_index: u32, json: bool) -> anyhow::Result<()> {
    let settings = config.camera_settings();
    let cameras = tokio::task::spawn_blocking(move || scan_cameras(max_index, &settings)).await?;

    if cameras.is_empty() {
        bail!("no working camera in indices 0..={max_index}");
    }

    if json {
        for camera in &cameras {
            println!("{}", serde_json::to_string(camera)?);
        }
        return Ok(());
    }

    for camera in &cameras {
        let path = camera
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}\t{}\t{}",
            camera.index,
            path,
            camera.name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
