use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;

use folio::error::{BuildError, Chainable, Result};
use folio::filters::{self, ContributorDirectory};
use folio::markdown::frontmatter;
use folio::rayon::prelude::*;
use folio::util::slugify;
use folio::{error, ContentItem};

use crate::config::Settings;
use crate::util::{dircheck, relative_str};
use crate::{ASSETS_DIR, CONTRIBUTORS_FILE};

/// A site on disk: where it lives, where it goes and how it's configured.
#[derive(Debug)]
pub struct Quire {
    pub root: PathBuf,
    pub output: PathBuf,
    pub settings: Settings,
    pub content_root: PathBuf,
    pub data_root: Option<PathBuf>,
    pub asset_root: Option<PathBuf>,
}

impl Quire {
    /// Reads the configuration of the site at `root`. Without an explicit
    /// `output`, the configured `output_dir` under `root` is used.
    pub fn new<I: AsRef<Path>>(root: I, output: Option<PathBuf>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let settings = Settings::read(&root)?;
        let content_root = dircheck(&root, &settings.content_dir, true)?
            .ok_or_else(|| error!("missing content directory", "path" => settings.content_dir.display()))?;

        Ok(Quire {
            output: output.unwrap_or_else(|| root.join(&settings.output_dir)),
            data_root: dircheck(&root, &settings.data_dir, false)?,
            asset_root: match settings.passthrough_copy {
                true => dircheck(&root, Path::new(ASSETS_DIR), false)?,
                false => None,
            },
            content_root,
            settings,
            root,
        })
    }

    /// Loads every content file, ordered by relative path.
    pub fn discover(&self) -> Result<Vec<ContentItem>> {
        let mut files = vec![];
        for entry in jwalk::WalkDir::new(&self.content_root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.settings.is_template_format(&path) {
                tracing::warn!(path = %path.display(), "skipping file with unknown format");
                continue;
            }

            files.push((relative_str(&self.content_root, &path), path));
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        tracing::debug!(files = files.len(), root = %self.content_root.display(), "discovered content");

        files.par_iter()
            .map(|(relative, path)| self.load(relative, path))
            .collect()
    }

    /// Loads `_data/contributors.json`, if there is one.
    pub fn contributors(&self) -> Result<ContributorDirectory> {
        let Some(path) = self.data_root.as_ref().map(|data| data.join(CONTRIBUTORS_FILE)) else {
            return Ok(ContributorDirectory::default());
        };

        if !path.is_file() {
            return Ok(ContributorDirectory::default());
        }

        let json = std::fs::read_to_string(&path)?;
        let directory = ContributorDirectory::from_json(&json)
            .chain_with(|| error!("invalid contributor directory", "path" => path.display()))?;

        tracing::debug!(contributors = directory.len(), "loaded contributors");
        Ok(directory)
    }

    fn load(&self, relative: &str, path: &Path) -> Result<ContentItem> {
        let source = std::fs::read_to_string(path)
            .chain_with(|| error!("failed to read content", "path" => path.display()))?;

        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .ok();

        item_from_source(&self.settings, relative, &source, modified)
            .map(|item| item.with_source(path))
            .chain_with(|| error!("failed to load content", "path" => path.display()))
    }
}

/// Keys of the front matter that map onto [`ContentItem`] fields. All other
/// keys end up in `extra`.
const KNOWN_KEYS: &[&str] = &[
    "slug", "title", "description", "date", "updated", "tags", "draft",
    "language", "contributors", "measurement", "layout",
];

/// Builds the item stored at `relative` (to the content root) from its
/// `source`. `modified` stands in for a missing `date`.
pub fn item_from_source(
    settings: &Settings,
    relative: &str,
    source: &str,
    modified: Option<DateTime<Utc>>,
) -> Result<ContentItem> {
    let (front, body) = frontmatter::parse(source)?;
    let fields = Fields(&front);
    let language = language(settings, relative, fields.string("language")?);

    let (slug, name) = match fields.string("slug")? {
        Some(slug) => (slug.to_string(), slug.to_string()),
        None => derived_slug(settings, relative, &language),
    };

    let date = match fields.date("date")?.or(modified) {
        Some(date) => date,
        None => return Err(BuildError::configuration("front matter `date`", "missing").into()),
    };

    let mut item = ContentItem::new(&*slug, date)
        .with_title(fields.string("title")?.unwrap_or(name.as_str()))
        .with_body(body)
        .with_path(logical_path(relative, &name))
        .with_language(language)
        .with_tags(fields.strings("tags")?)
        .with_contributors(fields.strings("contributors")?)
        .with_draft(fields.bool("draft")?.unwrap_or(false));

    if let Some(description) = fields.string("description")? {
        item = item.with_description(description);
    }

    if let Some(updated) = fields.date("updated")? {
        item = item.with_updated(updated);
    }

    if let Some(layout) = fields.string("layout")? {
        item = item.with_layout(layout);
    }

    if let Some(measurement) = front.get("measurement") {
        item = item.with_measurement(serde_json::to_value(measurement)?);
    }

    let mut extra = folio::taxonomy::Extra::new();
    for (key, value) in front {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            extra.insert(key, serde_json::to_value(value)?);
        }
    }

    Ok(item.with_extra(extra))
}

/// The slug of the file at `relative` and the name it's served under.
///
/// The name is the path slug, ignoring a leading language directory. Items
/// in a language other than the default one are keyed by `<lang>/<name>`,
/// so `en/blog/hello.md` is `hello` and `fr/blog/hello.md` is `fr/hello`.
fn derived_slug(settings: &Settings, relative: &str, language: &str) -> (String, String) {
    let stripped = filters::strip_language(relative, &settings.languages);
    let name = match filters::path_slug(&stripped) {
        name if name.is_empty() => "index".to_string(),
        name => name,
    };

    match language == settings.default_language {
        true => (name.clone(), name),
        false => (format!("{language}/{name}"), name),
    }
}

/// `en/blog/post.md` is served at `/en/blog/<name>/`; an `index` file is
/// served at its directory. Directory names are slugified.
fn logical_path(relative: &str, name: &str) -> String {
    let (dir, file) = relative.rsplit_once('/').unwrap_or(("", relative));
    let is_index = file.split('.').next() == Some("index");
    let mut path = String::from("/");
    for segment in dir.split('/').map(slugify).filter(|s| !s.is_empty()) {
        path.push_str(&segment);
        path.push('/');
    }

    if !is_index && !name.is_empty() {
        path.push_str(name);
        path.push('/');
    }

    path
}

fn language(settings: &Settings, relative: &str, explicit: Option<&str>) -> String {
    if let Some(language) = explicit {
        return language.to_string();
    }

    let known: FxHashSet<&str> = settings.languages.iter().map(|l| &**l).collect();
    match relative.split_once('/') {
        Some((first, _)) if known.contains(first) => first.to_string(),
        _ => settings.default_language.clone(),
    }
}

/// Typed access to front matter values.
struct Fields<'a>(&'a toml::Table);

impl<'a> Fields<'a> {
    fn mismatch(key: &str, expected: &str, found: &toml::Value) -> BuildError {
        BuildError::configuration(
            format!("front matter `{key}`"),
            format!("expected {expected}, found {}", found.type_str())
        )
    }

    fn string(&self, key: &str) -> Result<Option<&'a str>, BuildError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(s)),
            Some(v) => Err(Self::mismatch(key, "a string", v)),
        }
    }

    fn bool(&self, key: &str) -> Result<Option<bool>, BuildError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(toml::Value::Boolean(b)) => Ok(Some(*b)),
            Some(v) => Err(Self::mismatch(key, "a boolean", v)),
        }
    }

    fn strings(&self, key: &str) -> Result<Vec<&'a str>, BuildError> {
        let values = match self.0.get(key) {
            None => return Ok(vec![]),
            Some(toml::Value::String(s)) => return Ok(vec![s]),
            Some(toml::Value::Array(values)) => values,
            Some(v) => return Err(Self::mismatch(key, "a list of strings", v)),
        };

        values.iter()
            .map(|v| v.as_str().ok_or_else(|| Self::mismatch(key, "a list of strings", v)))
            .collect()
    }

    fn date(&self, key: &str) -> Result<Option<DateTime<Utc>>, BuildError> {
        let date = match self.0.get(key) {
            None => return Ok(None),
            Some(toml::Value::Datetime(d)) => filters::parse_date(&d.to_string()),
            Some(toml::Value::String(s)) => filters::parse_date(s),
            Some(toml::Value::Integer(secs)) => filters::timestamp(*secs),
            Some(v) => return Err(Self::mismatch(key, "a date", v)),
        };

        date.map(Some).ok_or_else(|| BuildError::configuration(
            format!("front matter `{key}`"),
            "not a recognized date"
        ))
    }
}
