use eframe::egui;
use palinsesto_viewer::app::PalinsestoApp;
use palinsesto_viewer::config::ViewerConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = ViewerConfig::from_env();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_min_inner_size([700.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Visualizzatore Palinsesto BF",
        options,
        Box::new(|_cc| Ok(Box::new(PalinsestoApp::new(config)))),
    )
}
