//! `royalec`: run the Royale compiler configuration and report the result.

mod logging;
mod render;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use royale_config::{Configurator, Properties, Target};
use tracing::{debug, error};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TargetKind {
    /// Application
    Swf,
    /// Library
    Swc,
}

impl From<TargetKind> for Target {
    fn from(kind: TargetKind) -> Self {
        match kind {
            TargetKind::Swf => Target::Swf,
            TargetKind::Swc => Target::Swc,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "royalec")]
#[command(about = "Royale compiler configuration", version)]
struct Cli {
    /// Print the buffered option values after configuring
    #[arg(long)]
    dump: bool,

    /// How to print the result
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Trace logging; with --dump, list every option with its flags and value sources
    #[arg(long)]
    diagnostics: bool,

    /// Kind of artifact being configured
    #[arg(long, value_enum, default_value_t = TargetKind::Swf)]
    target: TargetKind,

    /// Extra process property, e.g. --property royalelib=/opt/royale/frameworks
    #[arg(long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
    properties: Vec<(String, String)>,

    /// Only check the arguments, without loading files or committing
    #[arg(long)]
    validate_only: bool,

    /// Compiler options and input files, e.g. -- -o app.swf src/App.mxml
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn parse_property(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", text)),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let level = if cli.diagnostics { "trace" } else { cli.log_level.as_str() };
    logging::init_logging(level);
    Ok(if run(cli)? { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Returns whether the configuration succeeded.
fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut properties = Properties::from_env();
    for (key, value) in &cli.properties {
        properties.set(key.clone(), value.clone());
    }
    let mut configurator = Configurator::new()
        .context("building option registry")?
        .with_properties(properties);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stderr = io::stderr();
    let mut err = stderr.lock();

    let target = Target::from(cli.target);
    if cli.validate_only || target == Target::Swf {
        if let Err(e) = configurator.validate_configuration(&cli.args, target) {
            error!(error = %e, "Invalid arguments");
            writeln!(err, "{}", royale_config::ConfigurationProblem::from(e))?;
            return Ok(false);
        }
        if cli.validate_only {
            writeln!(out, "arguments are valid for {:?}", cli.target)?;
            return Ok(true);
        }
    }

    let success = configurator.configure(&cli.args);
    debug!(success, "Configurator finished");

    if let Some(request) = configurator.info_request() {
        render::write_info(&mut out, &configurator, &request)?;
        return Ok(true);
    }

    match cli.report {
        ReportFormat::Text => render::write_problems(&mut err, configurator.problems())?,
        ReportFormat::Json => render::write_report_json(&mut out, &configurator)?,
    }

    if cli.dump {
        if let Some(buffer) = configurator.buffer() {
            if cli.diagnostics {
                write!(out, "{}", buffer.info_dump())?;
            } else {
                write!(out, "{}", buffer)?;
            }
        }
    }

    Ok(success)
}
