pub mod ast;
pub mod cluster;
pub mod config;
pub mod controller;
pub mod diagram;
pub mod graph;
pub mod import;
pub mod interaction;
pub mod layout;
pub mod lexer;
pub mod measure;
pub mod parser;
pub mod routing;

use wasm_bindgen::prelude::*;

use config::{Config, LayoutConfig};
use controller::DiagramController;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn controller(seed: Option<u64>) -> DiagramController {
    DiagramController::new(Config {
        layout: LayoutConfig {
            seed,
            ..LayoutConfig::default()
        },
        ..Config::default()
    })
}

/// Lay out DBML source; returns the diagram as JSON.
#[wasm_bindgen(js_name = "dbmlToDiagram")]
pub fn dbml_to_diagram(source: &str, seed: Option<u64>) -> Result<String, String> {
    let mut controller = controller(seed);
    controller.load_source(source);
    serde_json::to_string(&controller.diagram()).map_err(|e| e.to_string())
}

/// Lay out an exported database JSON object; returns the diagram as JSON.
#[wasm_bindgen(js_name = "databaseToDiagram")]
pub fn database_to_diagram(json: &str, seed: Option<u64>) -> Result<String, String> {
    let mut controller = controller(seed);
    controller
        .load_database_json(json)
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&controller.diagram()).map_err(|e| e.to_string())
}
