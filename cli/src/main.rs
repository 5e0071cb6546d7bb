//! `easeml`: validate, match and generate ease.ml schemas and datasets.

mod app;
mod types;

use clap::Parser;

use app::EaseMlApp;
use types::EaseMlCli;

fn main() {
    let cli = EaseMlCli::parse();
    let app = EaseMlApp::new(cli);
    if app.run().is_err() {
        std::process::exit(1);
    }
}
