//! The render pipeline: validate, generate, render, and optionally mask.

use santa_core::time::{measure, pretty_duration};
use santa_core::Settings;
use santa_generators::Registry;
use santa_template::{Engine, Template};
use santa_types::{GeneratorConfig, RenderContext, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::mask::mask;
use crate::validation::validate_generator_configs;

/// A template plus the generators it draws from.
///
/// This is the request document read by the CLI:
///
/// ```yaml
/// template: |
///   password: {{ .DB.value }}
/// generators:
///   - name: DB
///     type: random_password
///     config:
///       length: 24
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRequest {
    /// Template source
    pub template: String,
    /// Generator entries, run in order
    #[serde(default)]
    pub generators: Vec<GeneratorConfig>,
}

impl SecretRequest {
    /// Parse a request from YAML (JSON is accepted too).
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Result of a dry run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DryRunResult {
    /// Rendered output with every value masked
    pub masked_output: String,
    /// Names of the generators that ran, in order
    pub generators_used: Vec<String>,
    /// Wall time for generation and rendering
    pub execution_time: Duration,
}

/// What [`Renderer::execute`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutput {
    /// Real output
    Rendered(String),
    /// Masked preview
    DryRun(DryRunResult),
}

impl RenderOutput {
    /// Text to show: the rendered document or its masked preview.
    pub fn text(&self) -> &str {
        match self {
            RenderOutput::Rendered(text) => text,
            RenderOutput::DryRun(result) => &result.masked_output,
        }
    }
}

/// Runs generators and renders templates against their output.
#[derive(Debug, Clone)]
pub struct Renderer {
    registry: Arc<Registry>,
    settings: Settings,
    engine: Engine,
}

impl Renderer {
    /// Renderer over `registry` with default settings.
    pub fn new(registry: Arc<Registry>) -> Self {
        let settings = Settings::default();
        Self {
            registry,
            engine: Engine::new().with_max_size(settings.max_template_size),
            settings,
        }
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.engine = Engine::new().with_max_size(settings.max_template_size);
        self.settings = settings;
        self
    }

    /// Current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The registry generators are resolved from.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Check generator entries and the template without generating anything.
    pub fn validate(&self, template: &str, configs: &[GeneratorConfig]) -> Result<()> {
        validate_generator_configs(configs, &self.registry)?;
        self.engine.validate(template)
    }

    /// Run every generator in order and collect their outputs by name.
    pub fn generate(&self, configs: &[GeneratorConfig]) -> Result<RenderContext> {
        validate_generator_configs(configs, &self.registry)?;

        let mut context = RenderContext::with_capacity(configs.len());
        for entry in configs {
            tracing::info!(generator = %entry.name, generator_type = %entry.kind, "running generator");
            let (output, elapsed) = measure(|| self.registry.generate(&entry.kind, &entry.config));
            let output = output.map_err(|e| e.in_generator(&entry.name, &entry.kind))?;

            let mut fields: Vec<&str> = output.keys().map(String::as_str).collect();
            fields.sort_unstable();
            tracing::debug!(
                generator = %entry.name,
                fields = ?fields,
                elapsed = %pretty_duration(elapsed),
                "generator finished"
            );
            context.insert(entry.name.clone(), output);
        }
        Ok(context)
    }

    /// Validate, generate, and render.
    ///
    /// The template is parsed before any generator runs, so a rejected
    /// template never triggers key generation.
    pub fn render(&self, template: &str, configs: &[GeneratorConfig]) -> Result<String> {
        let parsed = self.prepare(template, configs)?;
        let context = self.generate(configs)?;
        self.finish(&parsed, &context)
    }

    /// Render, then mask the result.
    pub fn dry_run(&self, template: &str, configs: &[GeneratorConfig]) -> Result<DryRunResult> {
        let started = Instant::now();
        let rendered = self.render(template, configs)?;
        let masked_output = mask(&rendered);
        let execution_time = started.elapsed();

        tracing::info!(
            generators = configs.len(),
            elapsed = %pretty_duration(execution_time),
            "dry run complete"
        );
        Ok(DryRunResult {
            masked_output,
            generators_used: configs.iter().map(|c| c.name.clone()).collect(),
            execution_time,
        })
    }

    /// Render a request, masking when `dry_run` is set in the settings.
    pub fn execute(&self, request: &SecretRequest) -> Result<RenderOutput> {
        if self.settings.dry_run {
            self.dry_run(&request.template, &request.generators)
                .map(RenderOutput::DryRun)
        } else {
            self.render(&request.template, &request.generators)
                .map(RenderOutput::Rendered)
        }
    }

    fn prepare(&self, template: &str, configs: &[GeneratorConfig]) -> Result<Template> {
        validate_generator_configs(configs, &self.registry)?;
        self.engine.parse(template)
    }

    fn finish(&self, template: &Template, context: &RenderContext) -> Result<String> {
        let rendered = template.render(context)?;
        tracing::debug!(bytes = rendered.len(), "template rendered");
        Ok(rendered)
    }
}
