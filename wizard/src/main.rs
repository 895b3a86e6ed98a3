use analytics_wizard::ReportOptions;
use std::path::{Path, PathBuf};

const USAGE: &str = "\
Usage: analytics-wizard [--config <file>] [MODE]

Modes:
  (default)                    interactive terminal wizard
  --tui-smoke[=<page>]         render one frame and exit (connect|collections|analytics)
  --print-config               print the effective configuration as TOML
  --report --host <h> --username <u> --schema <db> [--port <p>] [--table <t>] [--html <file>]
                               run the wizard headless and write the page as HTML;
                               the password is read from ANALYTICS_WIZARD_PASSWORD";

/// Value following `flag`, or the part after `flag=`.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{}=", flag);
    args.iter().enumerate().find_map(|(i, a)| {
        if a == flag {
            args.get(i + 1).cloned()
        } else {
            a.strip_prefix(&prefix).map(str::to_string)
        }
    })
}

fn exit_on_error(result: anyhow::Result<()>) {
    if let Err(e) = result {
        eprintln!("analytics-wizard: {:#}", e);
        std::process::exit(1);
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return;
    }

    let config_path = flag_value(&args, "--config").map(PathBuf::from);
    let config_path: Option<&Path> = config_path.as_deref();

    if args.iter().any(|a| a == "--print-config") {
        exit_on_error(analytics_wizard::print_config(config_path));
        return;
    }

    // Non-interactive TUI smoke test mode (for automated checks).
    // Usage: --tui-smoke or --tui-smoke=connect|collections|analytics
    if let Some(arg) = args
        .iter()
        .find(|a| a.as_str() == "--tui-smoke" || a.starts_with("--tui-smoke="))
    {
        let target = arg
            .split_once('=')
            .map(|(_, v)| v)
            .filter(|v| !v.trim().is_empty());
        exit_on_error(analytics_wizard::run_tui_smoke(target, config_path));
        return;
    }

    if args.iter().any(|a| a == "--report") {
        let opts = ReportOptions {
            config_path: config_path.map(Path::to_path_buf),
            host: flag_value(&args, "--host").unwrap_or_default(),
            port: flag_value(&args, "--port"),
            username: flag_value(&args, "--username").unwrap_or_default(),
            schema: flag_value(&args, "--schema").unwrap_or_default(),
            table: flag_value(&args, "--table"),
            html_out: flag_value(&args, "--html").map(PathBuf::from),
        };
        exit_on_error(analytics_wizard::run_report(opts));
        return;
    }

    exit_on_error(analytics_wizard::run_tui(config_path));
}
