//! sitesync CLI entrypoint.
//!
//! Brings the local content directory up to date with the latest release,
//! applies any plugin bundles, then serves the site on 127.0.0.1 and opens a
//! browser until the operator presses Enter.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use sitesync::SiteConfig;
use sitesync_installer::cli::Cli;
use sitesync_installer::content::progress::{BarProgress, DownloadProgress, SilentProgress};
use sitesync_installer::error::{Result, SiteError};
use sitesync_installer::layout::SiteLayout;
use sitesync_installer::output::{serving_message, write_stderr_line};
use sitesync_installer::serve::serve;
use sitesync_installer::sync::{SyncConfig, synchronize};
use std::io::Write;
use std::time::Duration;

/// Pause before launching the browser so the server is accepting requests.
const BROWSER_DELAY: Duration = Duration::from_millis(1500);

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_env(env_logger::Env::default())
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    // Step 1: Resolve the base directory and configuration
    let base_dir = resolve_base_dir(cli.dir.as_deref())?;
    let config = load_config(cli, &base_dir)?;
    let layout = SiteLayout::new(base_dir, config.layout.clone());

    // Step 2: Synchronize content and overlay
    let sync_config = SyncConfig {
        layout: &layout,
        skip_remote_check: cli.skip_check,
        mods_path: cli.mods_path.as_deref(),
        quiet: cli.quiet,
    };
    let progress: Box<dyn DownloadProgress> = if cli.quiet {
        Box::new(SilentProgress)
    } else {
        Box::new(BarProgress::stderr())
    };
    let outcome = synchronize(&sync_config, &config.release, progress, stderr)?;
    log::info!("content {:?}, overlay {:?}", outcome.content, outcome.overlay);

    if cli.sync_only {
        return Ok(());
    }

    // Step 3: Serve until the operator presses Enter
    let content_root = layout.content_root();
    let handle = serve(&content_root, cli.port_or(config.server.port))?;
    write_stderr_line(stderr, serving_message(&handle.url(), &content_root));
    if !cli.no_browser {
        open_browser_later(handle.url());
    }
    wait_for_enter()?;
    handle.stop()?;
    Ok(())
}

fn resolve_base_dir(dir: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    if let Some(explicit) = dir {
        return Ok(explicit.to_owned());
    }
    let current = std::env::current_dir().map_err(SiteError::CurrentDir)?;
    Utf8PathBuf::try_from(current).map_err(|error| SiteError::NonUtf8Path {
        path: error.as_path().display().to_string(),
    })
}

/// An explicit `--config` must exist; the default location is optional.
fn load_config(cli: &Cli, base_dir: &Utf8Path) -> Result<SiteConfig> {
    let path = cli.config_path(base_dir);
    let config = if cli.config.is_some() {
        SiteConfig::load_from(&path)?
    } else {
        SiteConfig::load_or_default(&path)?
    };
    Ok(config)
}

fn open_browser_later(url: String) {
    std::thread::spawn(move || {
        std::thread::sleep(BROWSER_DELAY);
        if let Err(error) = open::that(&url) {
            log::warn!("could not open a browser at {url}: {error}");
        }
    });
}

fn wait_for_enter() -> Result<()> {
    let mut line = String::new();
    let read = std::io::stdin()
        .read_line(&mut line)
        .map_err(SiteError::Stdin)?;
    if read == 0 {
        log::debug!("standard input closed; stopping the server");
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}
