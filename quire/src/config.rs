use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use folio::error;
use folio::error::{BuildError, Chainable, Result};
use folio::filters::{ContributorDirectory, Filters, Repository};
use folio::templating::EngineConfig;
use folio::CollectionBuilder;

pub const TEMPLATE_ENGINES: &[&str] = &["minijinja"];
pub const MARKDOWN_ENGINES: &[&str] = &["pulldown-cmark"];
pub const TEMPLATE_FORMATS: &[&str] = &["md", "markdown", "html"];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub data_dir: PathBuf,
    pub includes_dir: PathBuf,
    pub template_formats: Vec<String>,
    pub template_engine: String,
    pub markdown_engine: String,
    /// Copy `assets/` to the output verbatim.
    pub passthrough_copy: bool,
    /// Used by items that don't name a layout, if the template exists.
    pub layout: String,
    pub recent_window: usize,
    pub export_env: String,
    pub languages: Vec<String>,
    pub default_language: String,
    pub repository: Option<Repository>,
    /// Writes an RSS feed of the posts collection when present.
    pub feed: Option<FeedSettings>,
    /// Every other key; exposed to templates as `G`.
    #[serde(flatten)]
    pub globals: serde_json::Map<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            content_dir: crate::CONTENT_DIR.into(),
            output_dir: crate::OUTPUT_DIR.into(),
            data_dir: crate::DATA_DIR.into(),
            includes_dir: crate::INCLUDES_DIR.into(),
            template_formats: vec!["md".into(), "html".into()],
            template_engine: TEMPLATE_ENGINES[0].into(),
            markdown_engine: MARKDOWN_ENGINES[0].into(),
            passthrough_copy: true,
            layout: "default.html".into(),
            recent_window: CollectionBuilder::DEFAULT_RECENT_WINDOW.get(),
            export_env: CollectionBuilder::DEFAULT_EXPORT_ENV.into(),
            languages: vec!["en".into()],
            default_language: "en".into(),
            repository: None,
            feed: None,
            globals: serde_json::Map::new(),
        }
    }
}

/// The `[feed]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedSettings {
    pub title: String,
    /// The absolute URL of the deployed site; item links are joined to it.
    pub url: String,
    #[serde(default)]
    pub description: String,
    /// Relative to the output directory.
    #[serde(default = "FeedSettings::default_path")]
    pub path: PathBuf,
    /// At most this many of the newest posts; all of them if unset.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl FeedSettings {
    fn default_path() -> PathBuf {
        crate::FEED_FILE.into()
    }
}

impl Settings {
    /// Reads `folio.toml` from the site `root`, falling back to the defaults
    /// if there is none.
    pub fn read(root: &Path) -> Result<Self> {
        let path = root.join(crate::CONFIG_FILE);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Settings::default());
        }

        let source = std::fs::read_to_string(&path)
            .chain_with(|| error!("failed to read configuration", "path" => path.display()))?;

        Settings::parse(&source)
            .chain_with(|| error!("invalid configuration", "path" => path.display()))
    }

    pub fn parse(source: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        fn one_of(option: &str, value: &str, options: &[&str]) -> Result<(), BuildError> {
            match options.contains(&value) {
                true => Ok(()),
                false => Err(BuildError::configuration(option, format!(
                    "`{value}` is not supported; expected one of {}", options.join(", ")
                ))),
            }
        }

        one_of("template_engine", &self.template_engine, TEMPLATE_ENGINES)?;
        one_of("markdown_engine", &self.markdown_engine, MARKDOWN_ENGINES)?;
        if self.template_formats.is_empty() {
            return Err(BuildError::configuration("template_formats", "at least one format is required"));
        }

        for format in &self.template_formats {
            one_of("template_formats", format, TEMPLATE_FORMATS)?;
        }

        if self.recent_window == 0 {
            return Err(BuildError::configuration("recent_window", "must be at least 1"));
        }

        if !self.languages.contains(&self.default_language) {
            return Err(BuildError::configuration("default_language", format!(
                "`{}` is not one of the configured `languages`", self.default_language
            )));
        }

        if let Some(repository) = &self.repository {
            if repository.url.is_empty() {
                return Err(BuildError::configuration("repository.url", "must not be empty"));
            }
        }

        if let Some(feed) = &self.feed {
            if !feed.url.starts_with("http://") && !feed.url.starts_with("https://") {
                return Err(BuildError::configuration("feed.url", "must be an absolute http(s) URL"));
            }

            if feed.limit == Some(0) {
                return Err(BuildError::configuration("feed.limit", "must be at least 1"));
            }
        }

        Ok(())
    }

    pub fn is_template_format(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.template_formats.iter().any(|f| f == ext))
    }

    pub fn collection_builder(&self) -> Result<CollectionBuilder> {
        Ok(CollectionBuilder::new()
            .recent_window(self.recent_window)?
            .export_env(&*self.export_env))
    }

    pub fn filters(&self, contributors: ContributorDirectory) -> Filters {
        let filters = Filters::new()
            .with_languages(self.languages.iter().map(|l| &**l))
            .with_contributors(contributors);

        match &self.repository {
            Some(repository) => filters.with_repository(repository.clone()),
            None => filters,
        }
    }

    /// The engine configuration for a site rooted at `root`.
    pub fn engine_config(&self, root: &Path) -> EngineConfig {
        let includes = root.join(&self.includes_dir);
        EngineConfig {
            includes: includes.is_dir().then_some(includes),
            globals: self.globals.clone(),
            ..Default::default()
        }
    }
}
