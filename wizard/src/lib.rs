// Customer analytics wizard
//
// Entry points used by the binary: the interactive terminal wizard, a single-frame TUI smoke
// mode, a headless HTML report mode and `--print-config`.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod render;
mod tui;
pub mod utils;
pub mod wizard;

pub use crate::config::WizardConfig;
pub use crate::error::{ErrorKind, WizardError, WizardResult};

use anyhow::{bail, Context, Result};
use log::{error, info};
use std::path::{Path, PathBuf};

use crate::api::{BackendClient, ReqwestTransport};
use crate::models::requests::ConnectForm;
use crate::render::html::HtmlRenderer;
use crate::wizard::{Orchestrator, Step};

/// Password for `--report` mode is read from here, never from the command line.
pub const PASSWORD_ENV: &str = "ANALYTICS_WIZARD_PASSWORD";

fn init_logging(with_stdout: bool, configured_dir: Option<&Path>) -> Result<PathBuf> {
    let log_dir = utils::path_resolver::resolve_log_folder(configured_dir)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");
    let json_log_file = log_dir.join(format!("wizard-{}.log", timestamp));
    let txt_log_file = log_dir.join(format!("wizard-{}.txt", timestamp));

    // JSON lines to .log, human-readable lines to .txt, and optionally to stdout
    // (never in TUI mode, it would corrupt the screen). fern appends the line separator.
    let mut dispatch = fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .level_for("hyper", log::LevelFilter::Info)
        .level_for("reqwest", log::LevelFilter::Info);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Info)
                .format(move |out, message, record| {
                    out.finish(format_args!("{}", human_line(&message.to_string(), record)));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = message.to_string();
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", json_line));
                })
                .chain(fern::log_file(&json_log_file).with_context(|| {
                    format!("Failed to open log file {:?}", json_log_file)
                })?),
        )
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    out.finish(format_args!("{}", human_line(&message.to_string(), record)));
                })
                .chain(fern::log_file(&txt_log_file).with_context(|| {
                    format!("Failed to open log file {:?}", txt_log_file)
                })?),
        );

    dispatch.apply().context("Logger already initialized")?;

    info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(log_dir)
}

fn human_line(message: &str, record: &log::Record) -> String {
    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let (phase, step, cleaned_message) = utils::logging::parse_log_metadata(message);
    utils::logging::format_human_readable_log(
        &timestamp_local.to_string(),
        record.level(),
        record.target(),
        &cleaned_message,
        phase.as_deref(),
        step.as_deref(),
    )
}

fn load_config(path: Option<&Path>) -> Result<WizardConfig> {
    WizardConfig::load(path)
}

fn start_logging(with_stdout: bool, config: &WizardConfig) {
    if let Err(e) = init_logging(with_stdout, config.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }
}

/// Interactive terminal wizard.
pub fn run_tui(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    start_logging(false, &config);

    info!(
        "[PHASE: initialization] Terminal wizard starting at {}",
        chrono::Utc::now()
    );

    tui::run(&config).map_err(|e| {
        error!("[PHASE: tui] [STEP: fatal] TUI exited with error: {:?}", e);
        e
    })
}

/// Non-interactive TUI smoke mode: render one frame of `target` and exit.
pub fn run_tui_smoke(target: Option<&str>, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    start_logging(false, &config);

    let target = tui::SmokeTarget::parse(target.unwrap_or("connect"))?;
    tui::smoke(&config, target).map_err(|e| {
        error!(
            "[PHASE: tui] [STEP: smoke] TUI smoke exited with error: {:?}",
            e
        );
        e
    })
}

/// Print the effective configuration as TOML.
pub fn print_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

/// Inputs for headless report mode.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub config_path: Option<PathBuf>,
    pub host: String,
    /// Falls back to the configured default port.
    pub port: Option<String>,
    pub username: String,
    pub schema: String,
    /// Table to analyze. Without one the page lists the available tables.
    pub table: Option<String>,
    /// Output file; stdout when absent.
    pub html_out: Option<PathBuf>,
}

/// Run the wizard without a terminal UI and write the resulting page as HTML.
///
/// The page is written even when a step fails, so it shows the same error a user would see.
pub fn run_report(opts: ReportOptions) -> Result<()> {
    let config = load_config(opts.config_path.as_deref())?;
    start_logging(false, &config);

    let form = ConnectForm {
        host: opts.host.clone(),
        port: opts
            .port
            .clone()
            .unwrap_or_else(|| config.default_port.to_string()),
        username: opts.username.clone(),
        password: std::env::var(PASSWORD_ENV).unwrap_or_default(),
        schema: opts.schema.clone(),
    };
    info!(
        "[PHASE: report] [STEP: start] backend={} table={:?}",
        config.backend_url, opts.table
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let transport = {
        let _guard = runtime.enter();
        ReqwestTransport::new(&config.backend_url, config.request_timeout())?
    };
    let mut orchestrator = Orchestrator::new(BackendClient::new(transport), HtmlRenderer::new())
        .with_collections_delay(config.collections_delay());

    let outcome = runtime.block_on(drive_report(
        &mut orchestrator,
        &form,
        opts.table.as_deref(),
    ));
    let page = orchestrator.into_renderer().to_page();
    write_page(&page, opts.html_out.as_deref())?;

    if let Err(e) = &outcome {
        error!("[PHASE: report] [STEP: failed] {:#}", e);
    }
    outcome
}

async fn drive_report(
    orchestrator: &mut Orchestrator<ReqwestTransport, HtmlRenderer>,
    form: &ConnectForm,
    table: Option<&str>,
) -> Result<()> {
    orchestrator.connect(form).await?;

    if orchestrator.wizard().step() != Step::SelectCollection {
        let message = orchestrator
            .wizard()
            .renderer()
            .status()
            .map(|s| s.message.clone())
            .unwrap_or_else(|| "Unable to load tables".to_string());
        bail!(message);
    }

    if let Some(table) = table {
        orchestrator.fetch_analytics(table).await?;
    }
    Ok(())
}

fn write_page(page: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, page)
                .with_context(|| format!("Failed to write report to {:?}", path))?;
            info!("[PHASE: report] [STEP: written] {:?}", path);
        }
        None => print!("{}", page),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_written_to_requested_file() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("report.html");
        let page = HtmlRenderer::new().to_page();

        write_page(&page, Some(&out)).unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn unwritable_target_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("missing-dir").join("report.html");
        assert!(write_page("x", Some(&out)).is_err());
    }
}
