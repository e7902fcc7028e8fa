//! Configuration loading and validation for bakery.
//!
//! Configuration is layered with [`figment`], later layers overriding earlier
//! ones:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. The user-level `bakery.toml` in the platform configuration directory.
//! 3. `bakery.toml` then `bakery.yaml` in the project source directory.
//! 4. Environment variables prefixed with `BAKERY_` (e.g. `BAKERY_POSTS_PER_PAGE=5`).
//!
//! Loaded configuration is immutable. The set of document types it declares is
//! exposed as a [`DocTypes`] registry which is threaded through the crawler,
//! catalog calls and render coordinator.

pub mod error;
mod registry;

pub use crate::registry::{DocType, DocTypes};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

/// File name of the TOML configuration file, both per-project and per-user.
pub const CONFIG_FILE_TOML: &str = "bakery.toml";
/// File name of the (optional) YAML project configuration file.
pub const CONFIG_FILE_YAML: &str = "bakery.yaml";
/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "BAKERY_";

/// Per document type settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocTypeConfig {
    /// Name of the template (relative to the template directory) used to
    /// render documents of this type.
    pub template: String,
}
impl DocTypeConfig {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }
}

/// The complete configuration for one bake.
///
/// Directory paths are relative to [`source`](Self::source) unless absolute;
/// use the `*_path()` accessors to get resolved paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project root.
    pub source: PathBuf,
    pub content_dir: PathBuf,
    pub template_dir: PathBuf,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Location of the SQLite document catalog.
    pub catalog: PathBuf,

    /// Registered document types, keyed by name.
    pub doc_types: BTreeMap<String, DocTypeConfig>,
    /// Document type assigned to every file found in the data directory.
    pub data_doc_type: String,

    /// Crawl files and directories whose name starts with a dot.
    pub include_hidden: bool,
    /// Any directory containing a file with this name is skipped (with all
    /// of its descendants).
    pub ignore_file: String,
    /// File extensions (without leading dot) crawled in the data directory.
    pub data_extensions: Vec<String>,

    /// Status applied when a header doesn't specify one.
    pub default_status: Option<String>,
    /// Type applied when a header doesn't specify one.
    pub default_type: Option<String>,
    /// [`time` format description](https://time-rs.github.io/book/api/format-description.html)
    /// used to parse header dates.
    pub date_format: String,
    /// Replace whitespace in tags with `-`.
    pub tag_sanitize: bool,

    /// Extension (including the leading dot) of rendered documents.
    pub output_extension: String,
    /// Appended to the file stem of rendered drafts.
    pub draft_suffix: String,
    /// Render `path/to/doc.md` as `path/to/doc/index.html`.
    pub uri_no_extension: bool,
    /// Only apply [`uri_no_extension`](Self::uri_no_extension) to source URIs
    /// beginning with this prefix.
    pub uri_no_extension_prefix: Option<String>,

    /// Document type listed on the index pages and in the feed.
    pub index_doc_type: String,
    pub paginate_index: bool,
    pub posts_per_page: u32,
    pub index_template: Option<String>,
    pub tag_template: Option<String>,
    pub archive_template: Option<String>,
    pub feed_template: Option<String>,
    pub sitemap_template: Option<String>,

    /// Maximum number of files processed at the same time during a crawl.
    pub crawl_concurrency: usize,
    /// Upper bound on how long a crawl is waited upon before it is reported
    /// as partial.
    pub crawl_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let doc_types = BTreeMap::from([
            ("page".to_string(), DocTypeConfig::new("page.html")),
            ("post".to_string(), DocTypeConfig::new("post.html")),
        ]);
        Self {
            source: PathBuf::from("."),
            content_dir: PathBuf::from("content"),
            template_dir: PathBuf::from("templates"),
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            catalog: PathBuf::from(".bakery/catalog.sqlite"),
            doc_types,
            data_doc_type: "data".to_string(),
            include_hidden: false,
            ignore_file: ".bakeignore".to_string(),
            data_extensions: vec!["json".to_string(), "yaml".to_string(), "yml".to_string(), "toml".to_string()],
            default_status: None,
            default_type: None,
            date_format: "[year]-[month]-[day]".to_string(),
            tag_sanitize: false,
            output_extension: ".html".to_string(),
            draft_suffix: "-draft".to_string(),
            uri_no_extension: false,
            uri_no_extension_prefix: None,
            index_doc_type: "post".to_string(),
            paginate_index: true,
            posts_per_page: 10,
            index_template: Some("index.html".to_string()),
            tag_template: Some("tags.html".to_string()),
            archive_template: Some("archive.html".to_string()),
            feed_template: Some("feed.xml".to_string()),
            sitemap_template: Some("sitemap.xml".to_string()),
            crawl_concurrency: 100,
            crawl_timeout_secs: 600,
        }
    }
}

impl Config {
    /// Builds the layered [`Figment`] for a project rooted at `source`,
    /// without extracting it.
    pub fn figment(source: impl AsRef<Path>) -> Figment {
        let source = source.as_ref();
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dirs) = ProjectDirs::from("", "", "bakery") {
            figment = figment.merge(Toml::file(dirs.config_dir().join(CONFIG_FILE_TOML)));
        }
        figment
            .merge(Toml::file(source.join(CONFIG_FILE_TOML)))
            .merge(Yaml::file(source.join(CONFIG_FILE_YAML)))
            .merge(Env::prefixed(ENV_PREFIX))
            // The project root is wherever we were pointed at, regardless of
            // what any of the files say.
            .merge(Serialized::default("source", source))
    }

    /// Load and validate the configuration for the project rooted at `source`.
    #[instrument(skip_all, fields(source = %source.as_ref().display()))]
    pub fn load(source: impl AsRef<Path>) -> Result<Self> {
        Self::from_figment(Self::figment(source))
    }

    /// Extract and validate a configuration from an arbitrary [`Figment`].
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(doc_types = config.doc_types.len(), "configuration loaded");
        Ok(config)
    }

    /// Defaults, rooted at the given project directory. Mostly useful in tests.
    pub fn with_source(source: impl Into<PathBuf>) -> Self {
        Self { source: source.into(), ..Self::default() }
    }

    fn validate(&self) -> Result<()> {
        if self.posts_per_page == 0 {
            exn::bail!(ErrorKind::Invalid {
                key: "posts_per_page",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.crawl_concurrency == 0 {
            exn::bail!(ErrorKind::Invalid {
                key: "crawl_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.data_doc_type.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid {
                key: "data_doc_type",
                reason: "must not be empty".to_string(),
            });
        }
        if self.doc_types.contains_key(&self.data_doc_type) {
            exn::bail!(ErrorKind::Invalid {
                key: "data_doc_type",
                reason: format!("`{}` is already a content document type", self.data_doc_type),
            });
        }
        if let Some(name) = self.doc_types.keys().find(|name| name.trim().is_empty() || name.contains(char::is_whitespace)) {
            exn::bail!(ErrorKind::Invalid {
                key: "doc_types",
                reason: format!("`{name}` is not a valid document type name"),
            });
        }
        if !self.doc_types.contains_key(&self.index_doc_type) {
            exn::bail!(ErrorKind::Invalid {
                key: "index_doc_type",
                reason: format!("`{}` is not a registered document type", self.index_doc_type),
            });
        }
        if let Some(default) = &self.default_type
            && !self.doc_types.contains_key(default)
        {
            exn::bail!(ErrorKind::Invalid {
                key: "default_type",
                reason: format!("`{default}` is not a registered document type"),
            });
        }
        if !self.output_extension.starts_with('.') {
            exn::bail!(ErrorKind::Invalid {
                key: "output_extension",
                reason: "must start with a dot".to_string(),
            });
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        // Joining an absolute path replaces the base entirely.
        self.source.join(path)
    }

    pub fn content_path(&self) -> PathBuf {
        self.resolve(&self.content_dir)
    }

    pub fn template_path(&self) -> PathBuf {
        self.resolve(&self.template_dir)
    }

    pub fn data_path(&self) -> PathBuf {
        self.resolve(&self.data_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(&self.catalog)
    }

    pub fn crawl_timeout(&self) -> Duration {
        Duration::from_secs(self.crawl_timeout_secs)
    }

    /// The immutable document type registry described by this configuration.
    pub fn doc_types(&self) -> DocTypes {
        DocTypes::from_config(self)
    }
}
