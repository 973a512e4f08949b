//! CLI entry point for the security analyzer.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use shadowscan::{
    admission::{admit, infer_language, infer_mime, normalize_language, AnalysisLimits},
    cli::{Cli, Commands},
    config::{generate_default_config, Config},
    providers::{Backend, Capability, OllamaProvider, ProviderDescriptor, ProviderRegistry},
    reporters::{report, OutputFormat},
    AnalysisReport, AnalysisRequest, Analyzer, Severity,
};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let format: OutputFormat = cli.format.parse().map_err(|e| anyhow::anyhow!("{}", e))?;
    let config_path = cli.config;

    match cli.command {
        Commands::Code {
            file,
            language,
            filename,
            output,
            fail_on,
        } => {
            let config = load_config(config_path.as_deref())?;
            let fail_on_severity = fail_on
                .as_deref()
                .map(|s| Severity::parse_threshold(s).ok_or_else(|| anyhow::anyhow!("Unknown severity: {}", s)))
                .transpose()?;

            let code = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let language = match language {
                Some(l) => normalize_language(&l),
                None => infer_language(&file)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("Cannot infer language of {}; pass --language", file.display()))?,
            };
            let filename = filename.or_else(|| file_name(&file));

            let request = AnalysisRequest::Code {
                code,
                language,
                filename,
            };
            let result = run(&config, &request).await?;
            write_report(&result, format, output)?;

            if let (Some(threshold), AnalysisReport::Code(analysis)) = (fail_on_severity, &result) {
                if let Some(max_sev) = analysis.max_severity() {
                    if max_sev >= threshold {
                        std::process::exit(1);
                    }
                }
            }
        }

        Commands::Diagram { file, mime, output } => {
            let config = load_config(config_path.as_deref())?;
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mime_type = match mime {
                Some(m) => m.trim().to_lowercase(),
                None => infer_mime(&file)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("Cannot infer image type of {}; pass --mime", file.display()))?,
            };

            let request = AnalysisRequest::Diagram {
                bytes,
                filename: file_name(&file).unwrap_or_else(|| "diagram".to_string()),
                mime_type,
            };
            let result = run(&config, &request).await?;
            write_report(&result, format, output)?;
        }

        Commands::Providers => {
            let config = load_config(config_path.as_deref())?;
            let registry = ProviderRegistry::from_config(&config.providers)?;
            if registry.descriptors().is_empty() {
                println!("No AI providers configured.");
                println!(
                    "Set ANTHROPIC_API_KEY or OPENAI_API_KEY, or enable [providers.ollama] in the config."
                );
                return Ok(());
            }

            let selected_text = registry.select(Capability::TextGeneration).ok();
            let selected_vision = registry.select(Capability::VisionGeneration).ok();

            println!("{}", "Configured providers (priority order)".bold());
            for descriptor in registry.descriptors() {
                let selected =
                    Some(descriptor) == selected_text || Some(descriptor) == selected_vision;
                let marker = if selected { "*".green() } else { " ".normal() };
                println!(
                    " {} {:<10} {:<18} {} {}",
                    marker,
                    descriptor.backend.to_string(),
                    descriptor.capability.to_string(),
                    descriptor.model.bright_cyan(),
                    descriptor.endpoint.dimmed()
                );
            }
        }

        Commands::Pull { model } => {
            let config = load_config(config_path.as_deref())?;
            let local = &config.providers.ollama;
            let model = model.unwrap_or_else(|| local.code_model.clone());
            let descriptor = ProviderDescriptor {
                backend: Backend::Ollama,
                capability: Capability::TextGeneration,
                endpoint: local.base_url.clone(),
                model: model.clone(),
                max_tokens: local.max_tokens,
                temperature: local.temperature,
            };
            let provider = OllamaProvider::new(
                descriptor,
                false,
                Duration::from_secs(config.analysis.timeout_seconds),
            )?;

            if provider.is_model_available(&model).await? {
                println!("{}", format!("Model {} is already available", model).green());
                return Ok(());
            }

            let spinner = spinner(&format!("Pulling {}...", model))?;
            let pulled = provider.pull_model(&model).await;
            spinner.finish_and_clear();
            pulled?;
            println!("{}", format!("Pulled model {}", model).green());
        }

        Commands::Init { output } => init(&output)?,
    }

    Ok(())
}

/// Load the config file if specified, otherwise the default one, then apply env overrides.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default(),
    };
    Ok(config.merge_with_env())
}

/// Admit the request, then run it with a spinner on stderr.
async fn run(config: &Config, request: &AnalysisRequest) -> Result<AnalysisReport> {
    admit(request, &AnalysisLimits::from(&config.analysis))?;

    let analyzer = Analyzer::with_config(config)?;
    let spinner = spinner(&format!("Analyzing {}...", request.kind()))?;
    let result = analyzer.analyze(request).await;
    spinner.finish_and_clear();
    Ok(result?)
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn write_report(result: &AnalysisReport, format: OutputFormat, output: Option<PathBuf>) -> Result<()> {
    if let Some(output_path) = output {
        let mut file = std::fs::File::create(&output_path)?;
        report(result, format, &mut file)?;
        eprintln!("Report written to: {}", output_path.display());
    } else {
        let mut stdout = io::stdout().lock();
        report(result, format, &mut stdout)?;
    }
    Ok(())
}

fn init(output: &Path) -> Result<()> {
    if output.exists() {
        eprintln!(
            "{}",
            format!("Config file already exists: {}", output.display()).yellow()
        );
        eprintln!("Use a different path or remove the existing file.");
        std::process::exit(1);
    }

    std::fs::write(output, generate_default_config())?;
    println!(
        "{}",
        format!("Created config file: {}", output.display()).green()
    );
    println!("Edit this file to configure AI providers and analysis limits.");
    Ok(())
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
