//! Parser for content files with a `key=value` header.
//!
//! ```text
//! title=Hello, World
//! type=post
//! status=published
//! date=2024-03-01
//! tags=rust, static sites
//! summary=Anything else lands in the attribute bag
//! ~~~~~~
//!
//! The body is everything after the separator line.
//! ```

use crate::Parser;
use crate::error::{ErrorKind, Result};
use crate::models::{DocumentModel, Status};
use bakery_config::{Config, DocTypes};
use bakery_source::file::SourceMeta;
use exn::ResultExt;
use serde_json::Value;
use std::path::Path;
use time::format_description::OwnedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::instrument;

/// Extensions of files that may carry a header.
pub const CONTENT_EXTENSIONS: [&str; 7] = ["md", "markdown", "html", "htm", "adoc", "asciidoc", "txt"];

const MIN_SEPARATOR_LENGTH: usize = 3;

#[derive(Debug)]
pub struct HeaderParser {
    registry: DocTypes,
    default_status: Option<Status>,
    default_type: Option<String>,
    date_format: OwnedFormatItem,
    tag_sanitize: bool,
}
impl HeaderParser {
    pub fn new(config: &Config) -> Result<Self> {
        let default_status = config
            .default_status
            .as_deref()
            .map(|s| s.parse::<Status>().map_err(|_| exn::Exn::from(ErrorKind::Configuration("default_status"))))
            .transpose()?;
        let date_format = time::format_description::parse_owned::<2>(&config.date_format)
            .or_raise(|| ErrorKind::Configuration("date_format"))?;
        Ok(Self {
            registry: config.doc_types(),
            default_status,
            default_type: config.default_type.clone(),
            date_format,
            tag_sanitize: config.tag_sanitize,
        })
    }

    /// Parse the contents of a content file.
    #[instrument(level = "debug", skip_all, fields(content_size = content.len()))]
    pub fn parse_content(&self, content: &str) -> Result<DocumentModel> {
        let (header, body) = split_header(content).ok_or_else(|| exn::Exn::from(ErrorKind::NoHeader))?;

        let mut doc_type = self.default_type.clone();
        let mut status = self.default_status;
        let mut title = None;
        let mut date = None;
        let mut tags = Default::default();
        let mut attributes = serde_json::Map::new();
        for line in header.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let (key, value) = line.split_once('=').ok_or_else(|| {
                exn::Exn::from(ErrorKind::InvalidHeader {
                    field: "header",
                    value: line.to_string(),
                })
            })?;
            let (key, value) = (key.trim(), value.trim());
            match key {
                "type" => doc_type = Some(value.to_string()),
                "status" => {
                    status = Some(value.parse::<Status>().map_err(|value| {
                        exn::Exn::from(ErrorKind::InvalidHeader { field: "status", value })
                    })?)
                },
                "title" => title = Some(value.to_string()),
                "date" => date = Some(self.parse_date(value)?),
                "tags" => tags = self.parse_tags(value),
                _ => {
                    attributes.insert(key.to_string(), Value::String(value.to_string()));
                },
            }
        }

        let doc_type = doc_type.ok_or_else(|| {
            exn::Exn::from(ErrorKind::InvalidHeader {
                field: "type",
                value: String::new(),
            })
        })?;
        if !self.registry.contains(&doc_type) || self.registry.is_data(&doc_type) {
            exn::bail!(ErrorKind::UnknownType(doc_type));
        }
        let status = status.ok_or_else(|| {
            exn::Exn::from(ErrorKind::InvalidHeader {
                field: "status",
                value: String::new(),
            })
        })?;

        Ok(DocumentModel {
            doc_type,
            status,
            title,
            date,
            tags,
            body: body.to_string(),
            attributes,
        })
    }

    fn parse_date(&self, value: &str) -> Result<OffsetDateTime> {
        if let Ok(date) = OffsetDateTime::parse(value, &Rfc3339) {
            return Ok(date);
        }
        if let Ok(datetime) = PrimitiveDateTime::parse(value, &self.date_format) {
            return Ok(datetime.assume_utc());
        }
        Date::parse(value, &self.date_format)
            .map(|date| date.midnight().assume_utc())
            .or_raise(|| ErrorKind::InvalidHeader {
                field: "date",
                value: value.to_string(),
            })
    }

    fn parse_tags(&self, value: &str) -> std::collections::BTreeSet<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(|tag| match self.tag_sanitize {
                true => tag.split_whitespace().collect::<Vec<_>>().join("-"),
                false => tag.to_string(),
            })
            .collect()
    }
}
impl Parser for HeaderParser {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| CONTENT_EXTENSIONS.contains(&ext.as_str()))
    }

    fn parse(&self, file: &SourceMeta) -> Result<DocumentModel> {
        let content = std::fs::read_to_string(&file.path).or_raise(|| ErrorKind::Io(file.path.clone()))?;
        self.parse_content(&content)
    }
}

/// Split a file into its header and body at the first separator line (three
/// or more `~` and nothing else).
fn split_header(content: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.len() >= MIN_SEPARATOR_LENGTH && trimmed.chars().all(|c| c == '~') {
            return Some((&content[..offset], &content[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakery_config::DocTypeConfig;
    use rstest::rstest;
    use time::macros::datetime;

    fn parser() -> HeaderParser {
        HeaderParser::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_parses_complete_header() {
        let content = "title=Hello, World\ntype=post\nstatus=published\ndate=2024-03-01\ntags=rust, static sites\nsummary=Short\n~~~~~~\n\nBody text.\n";
        let model = parser().parse_content(content).unwrap();
        assert_eq!(model.doc_type, "post");
        assert_eq!(model.status, Status::Published);
        assert_eq!(model.title.as_deref(), Some("Hello, World"));
        assert_eq!(model.date, Some(datetime!(2024-03-01 0:00 UTC)));
        assert_eq!(model.tags.iter().map(String::as_str).collect::<Vec<_>>(), vec!["rust", "static sites"]);
        assert_eq!(model.attributes.get("summary"), Some(&Value::String("Short".to_string())));
        assert_eq!(model.body, "\nBody text.\n");
    }

    #[test]
    fn test_date_formats() {
        let parser = parser();
        assert_eq!(parser.parse_date("2024-03-01T10:30:00Z").unwrap(), datetime!(2024-03-01 10:30 UTC));
        assert_eq!(parser.parse_date("2024-03-01").unwrap(), datetime!(2024-03-01 0:00 UTC));
        assert!(parser.parse_date("01/03/2024").is_err());
    }

    #[test]
    fn test_tag_sanitization() {
        let config = Config { tag_sanitize: true, ..Config::default() };
        let parser = HeaderParser::new(&config).unwrap();
        let model = parser.parse_content("type=post\nstatus=draft\ntags=static  sites, rust,rust, \n~~~\n").unwrap();
        assert_eq!(model.tags.iter().map(String::as_str).collect::<Vec<_>>(), vec!["rust", "static-sites"]);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = Config {
            default_status: Some("draft".to_string()),
            default_type: Some("page".to_string()),
            ..Config::default()
        };
        let model = HeaderParser::new(&config).unwrap().parse_content("title=About\n~~~~~~\nMe").unwrap();
        assert_eq!(model.doc_type, "page");
        assert_eq!(model.status, Status::Draft);
    }

    #[test]
    fn test_configured_types_are_accepted() {
        let mut config = Config::default();
        config.doc_types.insert("recipe".to_string(), DocTypeConfig::new("recipe.html"));
        let model = HeaderParser::new(&config).unwrap().parse_content("type=recipe\nstatus=published\n~~~\n").unwrap();
        assert_eq!(model.doc_type, "recipe");
    }

    #[rstest]
    #[case("Just a body, no header at all.\n")]
    #[case("")]
    fn test_no_header(#[case] content: &str) {
        let err = parser().parse_content(content).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoHeader));
        assert!(err.is_skippable());
    }

    #[rstest]
    #[case("status=published\n~~~~~~\n", "type")]
    #[case("type=post\n~~~~~~\n", "status")]
    #[case("type=post\nstatus=sometimes\n~~~~~~\n", "status")]
    #[case("type=post\nstatus=draft\ndate=yesterday\n~~~~~~\n", "date")]
    #[case("type=post\njust some words\n~~~~~~\n", "header")]
    fn test_invalid_header(#[case] content: &str, #[case] expected: &str) {
        let err = parser().parse_content(content).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidHeader { field, .. } if *field == expected));
    }

    #[rstest]
    #[case("type=recipe\nstatus=published\n~~~~~~\n")]
    #[case("type=data\nstatus=published\n~~~~~~\n")]
    fn test_unknown_type(#[case] content: &str) {
        let err = parser().parse_content(content).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownType(_)));
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let meta = SourceMeta {
            path: dir.path().join("missing.md"),
            source_uri: "missing.md".to_string(),
            size: 0,
            modified: OffsetDateTime::now_utc(),
        };
        let err = parser().parse(&meta).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(_)));
        assert!(!err.is_skippable());
    }

    #[rstest]
    #[case("post.md", true)]
    #[case("POST.MD", true)]
    #[case("page.html", true)]
    #[case("data.json", false)]
    #[case("README", false)]
    fn test_supports(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(parser().supports(Path::new(path)), expected);
    }

    #[test]
    fn test_bad_date_format_configuration() {
        let config = Config { date_format: "[nonsense".to_string(), ..Config::default() };
        let err = HeaderParser::new(&config).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Configuration("date_format")));
    }
}
