//! Validate a request without generating secrets.

use anyhow::Result;
use colored::Colorize;
use santa_core::Settings;
use santa_generators::Registry;
use santa_render::Renderer;
use std::path::Path;
use std::sync::Arc;

pub fn run(file: &Path, settings: Settings) -> Result<()> {
    let request = super::load_request(file)?;
    let renderer = Renderer::new(Arc::new(Registry::with_defaults())).with_settings(settings);
    renderer.validate(&request.template, &request.generators)?;

    println!(
        "{} {} ({} generator(s))",
        "Valid".green().bold(),
        file.display(),
        request.generators.len()
    );
    Ok(())
}
