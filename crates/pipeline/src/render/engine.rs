//! Template rendering.
//!
//! The render coordinator only talks to the [`TemplateEngine`] trait. The
//! bundled [`UponEngine`] loads every file in the template tree as a named
//! [upon] template (named by its path relative to the tree, e.g.
//! `partials/header.html`) and extends upon's syntax with:
//!
//! - **`slug`**: formatter converting strings to URL-safe slugs, stripping
//!   quotation marks first to avoid artifacts like leading/trailing hyphens.
//! - **`truncate`**: truncates strings to a maximum byte length at a character
//!   boundary, usable as either `truncate(value, n)` or `{{ value|truncate: n }}`.

use crate::render::error::{ErrorKind, Result};
use bakery_source::Walker;
use exn::ResultExt;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use tracing::instrument;
use upon::Engine;

/// Renders a model with a named template.
pub trait TemplateEngine: Send + Sync {
    /// Whether a template with this name is available.
    fn has_template(&self, name: &str) -> bool;

    /// Render `template` with `model`, writing the output to `out`.
    fn render(&self, model: &upon::Value, template: &str, out: &mut dyn Write) -> Result<()>;
}

/// [`TemplateEngine`] backed by [upon].
pub struct UponEngine {
    engine: Engine<'static>,
    names: BTreeSet<String>,
}
impl UponEngine {
    /// An engine with no templates, but with the `slug` and `truncate` addons
    /// registered.
    pub fn new() -> Self {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        Self {
            engine,
            names: BTreeSet::new(),
        }
    }

    /// Compile a template from source. Fails on syntax errors.
    pub fn add_template(&mut self, name: impl Into<String>, source: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.engine
            .add_template(name.clone(), source.into())
            .or_raise(|| ErrorKind::Template(name.clone()))?;
        self.names.insert(name);
        Ok(())
    }

    /// Names of every loaded template, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Load every (non-hidden) file under `dir` as a template.
    ///
    /// A missing directory is an engine with no templates.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub async fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let files = Walker::new(dir).list(|_| true).await.or_raise(|| ErrorKind::Load(dir.to_path_buf()))?;
        let mut engine = Self::new();
        for file in files {
            let source = tokio::fs::read_to_string(&file.path)
                .await
                .or_raise(|| ErrorKind::Load(file.path.clone()))?;
            engine.add_template(file.source_uri.clone(), source)?;
        }
        tracing::debug!(templates = engine.names.len(), "templates loaded");
        Ok(engine)
    }
}
impl Default for UponEngine {
    fn default() -> Self {
        Self::new()
    }
}
impl TemplateEngine for UponEngine {
    fn has_template(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn render(&self, model: &upon::Value, template: &str, out: &mut dyn Write) -> Result<()> {
        if !self.has_template(template) {
            exn::bail!(ErrorKind::MissingTemplate(template.to_string()));
        }
        self.engine
            .template(template)
            .render(model.clone())
            .to_writer(out)
            .or_raise(|| ErrorKind::Template(template.to_string()))
    }
}

/// Custom [`upon`] extensions.
mod addons {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Converts strings to URL-safe slugs.
    ///
    /// Strips quotation marks before slugifying to avoid awkward slug output
    /// like `"hello"` becoming `-hello-`.
    pub(crate) fn slug(s: &str) -> String {
        // Various quotation marks: '"''""„"`«»
        let marks = [
            '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}', '\u{0060}',
            '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
        ];
        let stripped: String = s.chars().filter(|c| !marks.contains(c)).collect();
        slugify!(&stripped)
    }

    fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => write!(f, "{}", slug(s))?,
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    /// Truncates a string to a maximum byte length at a character boundary.
    fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> String {
        s[..s.floor_char_boundary(max_bytes)].to_string()
    }

    pub(crate) fn configure(engine: &mut Engine<'_>) {
        // Bodies are already markup; never escape.
        engine.set_default_formatter(&upon_fmt::default);
        engine.add_formatter("slug", slug_formatter);
        engine.add_function("truncate", truncate_to_char_boundary);
    }
}

pub(crate) use self::addons::slug;
