//! Parser for structured data files (JSON, YAML, TOML).
//!
//! A data file's top-level object becomes the document's attribute bag. Data
//! documents are always [`Published`](Status::Published) and have no body.

use crate::Parser;
use crate::error::{ErrorKind, Result};
use crate::models::{DocumentModel, Status};
use bakery_config::Config;
use bakery_source::file::SourceMeta;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Format, Json, Toml, Yaml};
use serde_json::{Map, Value};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct DataFileParser {
    doc_type: String,
    extensions: Vec<String>,
}
impl DataFileParser {
    pub fn new(config: &Config) -> Self {
        Self {
            doc_type: config.data_doc_type.clone(),
            extensions: config.data_extensions.iter().map(|ext| ext.trim_start_matches('.').to_lowercase()).collect(),
        }
    }

    /// Parse data file content, with the format picked by `extension`.
    pub fn parse_content(&self, extension: &str, content: &str) -> Result<DocumentModel> {
        let figment = match extension {
            "json" => Figment::from(Json::string(content)),
            "yaml" | "yml" => Figment::from(Yaml::string(content)),
            "toml" => Figment::from(Toml::string(content)),
            _ => exn::bail!(ErrorKind::Malformed),
        };
        let attributes: Map<String, Value> = figment.extract().or_raise(|| ErrorKind::Malformed)?;
        Ok(DocumentModel {
            attributes,
            ..DocumentModel::new(&self.doc_type, Status::Published)
        })
    }

    fn extension(path: &Path) -> Option<String> {
        path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
    }
}
impl Parser for DataFileParser {
    fn supports(&self, path: &Path) -> bool {
        Self::extension(path).is_some_and(|ext| self.extensions.contains(&ext))
    }

    fn parse(&self, file: &SourceMeta) -> Result<DocumentModel> {
        let content = std::fs::read_to_string(&file.path).or_raise(|| ErrorKind::Io(file.path.clone()))?;
        let extension = Self::extension(&file.path).unwrap_or_default();
        self.parse_content(&extension, &content)
    }
}
