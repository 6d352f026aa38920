//! Entry point for the vllmtop TUI. Parses args and runs the App.

mod app;
mod logging;
mod ui;

use app::App;
use std::{env, sync::Arc};
use vllmtop::{
    api::HttpApi,
    config::Settings,
    prefs::{FilePrefs, PreferenceStore},
    session::{normalize_url, Session},
};

#[derive(Debug)]
struct ParsedArgs {
    url: Option<String>,
    interval: Option<String>,
    timeout: Option<String>,
    dry_run: bool,
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--interval MS|-i MS] [--timeout MS] [--dry-run] [http://HOST:PORT]\n\
         \n\
         Keys: s start, x stop, r restart, Enter switch model, l service logs,\n\
         u change server URL, S shut down host, q quit.\n\
         Env: VLLMTOP_POLL_MS, VLLMTOP_TIMEOUT_MS, VLLMTOP_LOG"
    )
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "vllmtop".into());
    let mut url: Option<String> = None;
    let mut interval: Option<String> = None;
    let mut timeout: Option<String> = None;
    let mut dry_run = false; // --dry-run

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--interval" | "-i" => {
                interval = it.next();
            }
            "--timeout" => {
                timeout = it.next();
            }
            "--dry-run" => {
                dry_run = true;
            }
            _ if arg.starts_with("--interval=") || arg.starts_with("--timeout=") => {
                if let Some((k, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        if k == "--interval" {
                            interval = Some(v.to_string());
                        } else {
                            timeout = Some(v.to_string());
                        }
                    }
                }
            }
            _ => {
                if url.is_none() {
                    url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument '{arg}'. {}", usage(&prog)));
                }
            }
        }
    }
    Ok(ParsedArgs {
        url,
        interval,
        timeout,
        dry_run,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    if let Err(e) = logging::init() {
        eprintln!("vllmtop: logging disabled: {e}");
    }

    let settings = Settings::from_env()
        .with_overrides(parsed.interval.as_deref(), parsed.timeout.as_deref());
    let url = parsed.url.as_deref().map(normalize_url).transpose()?;
    let prefs = Arc::new(FilePrefs::open_default());

    if parsed.dry_run {
        return dry_run(prefs.as_ref(), url, settings);
    }

    let api = Arc::new(HttpApi::new(settings.request_timeout)?);
    let session = Session::new(api, prefs, settings);
    let mut app = App::new(session);
    app.run(url).await
}

/// Persist the URL if given and report the effective configuration.
fn dry_run(prefs: &FilePrefs, url: Option<String>, settings: Settings) -> anyhow::Result<()> {
    if let Some(u) = url.as_deref() {
        prefs.save_server_url(u)?;
    }
    let effective = url.or_else(|| prefs.server_url());
    println!(
        "server: {}",
        effective.as_deref().unwrap_or("(not configured)")
    );
    println!("preferences: {}", prefs.path().display());
    println!("poll interval: {} ms", settings.poll_interval.as_millis());
    println!("request timeout: {} ms", settings.request_timeout.as_millis());
    Ok(())
}
