use std::time::Instant;

use tracing_subscriber::EnvFilter;

use crate::discover::Quire;

mod config;
mod discover;
mod feed;
mod render;
mod util;

pub const CONTENT_DIR: &str = "content";
pub const OUTPUT_DIR: &str = "_site";
pub const DATA_DIR: &str = "_data";
pub const INCLUDES_DIR: &str = "_includes";
pub const ASSETS_DIR: &str = "assets";
pub const CONFIG_FILE: &str = "folio.toml";
pub const CONTRIBUTORS_FILE: &str = "contributors.json";
pub const SEARCH_FILE: &str = "search.json";
pub const FEED_FILE: &str = "feed.xml";

/// Read when `--env` isn't given.
pub const ENV_VAR: &str = "FOLIO_ENV";

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Builds the site rooted at <input>.
        cmd quire {
            /// The site root, holding `folio.toml` and the content directory.
            required input: PathBuf
            /// Where to write the site; defaults to the configured `output_dir`.
            optional -o, --output output: PathBuf
            /// The environment flag, e.g. `prod`.
            optional --env env: String
            /// Log build progress.
            optional -v, --verbose
        }
    }
}

pub fn main() {
    let flags = flags::Quire::from_env_or_exit();

    let filter = match flags.verbose {
        true => EnvFilter::new("info"),
        false => EnvFilter::from_default_env(),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let env = flags.env
        .or_else(|| std::env::var(ENV_VAR).ok())
        .filter(|env| !env.is_empty());

    let start = Instant::now();
    let result = Quire::new(&flags.input, flags.output)
        .and_then(|quire| quire.build(env.as_deref()));

    match result {
        Ok(summary) => tracing::info!(
            pages = summary.pages,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "build finished"
        ),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
