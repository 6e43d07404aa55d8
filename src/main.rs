mod app;

use app::UploaderApp;
use batch_uploader::config::UploaderConfig;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = UploaderConfig::load()?;
    tracing::info!("batch uploader starting");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([600.0, 600.0])
            .with_min_inner_size([400.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Batch Uploader",
        options,
        Box::new(move |cc| Box::new(UploaderApp::new(cc, config))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {e}"))?;

    Ok(())
}
