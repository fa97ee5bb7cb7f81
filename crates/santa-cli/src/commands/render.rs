//! Render a request, or preview it masked.

use anyhow::Result;
use colored::Colorize;
use santa_core::time::pretty_duration;
use santa_core::Settings;
use santa_generators::Registry;
use santa_render::{RenderOutput, Renderer};
use std::path::Path;
use std::sync::Arc;

pub fn run(file: &Path, dry_run: bool, mut settings: Settings) -> Result<()> {
    let request = super::load_request(file)?;
    settings.dry_run |= dry_run;

    let renderer = Renderer::new(Arc::new(Registry::with_defaults())).with_settings(settings);
    let output = renderer.execute(&request)?;

    if let RenderOutput::DryRun(result) = &output {
        eprintln!(
            "{} {} generator(s) in {}: {}",
            "Dry run".yellow().bold(),
            result.generators_used.len(),
            pretty_duration(result.execution_time),
            result.generators_used.join(", ")
        );
    }

    let text = output.text();
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
    Ok(())
}
