//! CLI argument definitions for the sitesync binary.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint so parsing can be tested without running a sync.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use sitesync::CONFIG_FILE_NAME;

/// Keep a local copy of the latest release in sync and serve it.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "sitesync")]
#[command(version, about)]
#[command(long_about = concat!(
    "Keep a local copy of the latest release in sync and serve it.\n\n",
    "On each start the latest release is looked up and, when its tag differs ",
    "from the cached one, the release archive is downloaded and swapped into ",
    "the content directory. Plugin bundles found under --mods-path are copied ",
    "into the site and listed in its manifest. The site is then served on ",
    "127.0.0.1 until Enter is pressed.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Update and serve on the default port:\n",
    "    $ sitesync\n\n",
    "  Serve existing content without contacting the release server:\n",
    "    $ sitesync -r\n\n",
    "  Load plugin bundles and serve on another port:\n",
    "    $ sitesync --mods-path ~/mods -p 9000\n\n",
    "  Update only, without serving:\n",
    "    $ sitesync --sync-only",
))]
pub struct Cli {
    /// Port for the local HTTP server [default: from config, 8080].
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Skip the remote up-to-date check and reuse installed content.
    #[arg(short = 'r', long = "skip-check")]
    pub skip_check: bool,

    /// Directory searched recursively for plugin bundles.
    #[arg(long, value_name = "DIR")]
    pub mods_path: Option<Utf8PathBuf>,

    /// Base directory holding the content and version marker [default: current directory].
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<Utf8PathBuf>,

    /// Configuration file [default: <dir>/sitesync.toml when present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Do not open a browser once the server is running.
    #[arg(long)]
    pub no_browser: bool,

    /// Synchronize and exit without serving.
    #[arg(long)]
    pub sync_only: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Configuration file to load for `base_dir`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use clap::Parser;
    /// use sitesync_installer::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["sitesync"]);
    /// assert_eq!(cli.config_path(Utf8Path::new("/srv")), "/srv/sitesync.toml");
    ///
    /// let cli = Cli::parse_from(["sitesync", "-c", "/etc/site.toml"]);
    /// assert_eq!(cli.config_path(Utf8Path::new("/srv")), "/etc/site.toml");
    /// ```
    #[must_use]
    pub fn config_path(&self, base_dir: &Utf8Path) -> Utf8PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| base_dir.join(CONFIG_FILE_NAME))
    }

    /// Log filter implied by `-v` flags: `warn`, `info`, `debug`, then `trace`.
    #[must_use]
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    /// Port to serve on, preferring the flag over `configured`.
    #[must_use]
    pub fn port_or(&self, configured: u16) -> u16 {
        self.port.unwrap_or(configured)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
