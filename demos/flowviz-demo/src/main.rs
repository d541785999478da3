use app::App;
use eframe::{run_native, NativeOptions};

mod analyzer;
mod app;

const APP_NAME: &str = "flowviz demo";

fn main() -> eframe::Result {
    env_logger::init();

    let native_options = NativeOptions::default();
    run_native(
        APP_NAME,
        native_options,
        Box::new(|cc| Ok(Box::new(App::new(cc)))),
    )
}
