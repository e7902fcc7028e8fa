use crate::Config;
use std::collections::BTreeMap;

/// A registered document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocType {
    name: String,
    template: Option<String>,
}
impl DocType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template used to render documents of this type. Data documents have
    /// no template and are never written to the output directory.
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }
}

/// Immutable registry of every document type known to a bake.
///
/// Built once from [`Config`] and shared (by reference or clone) between the
/// crawler, the catalog calls that need a list of types, and the render
/// coordinator. There is intentionally no way to register a type after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTypes {
    types: BTreeMap<String, DocType>,
    data: String,
}
impl DocTypes {
    pub(crate) fn from_config(config: &Config) -> Self {
        let mut types: BTreeMap<String, DocType> = config
            .doc_types
            .iter()
            .map(|(name, settings)| {
                let doc_type = DocType {
                    name: name.clone(),
                    template: Some(settings.template.clone()),
                };
                (name.clone(), doc_type)
            })
            .collect();
        types.insert(
            config.data_doc_type.clone(),
            DocType {
                name: config.data_doc_type.clone(),
                template: None,
            },
        );
        Self {
            types,
            data: config.data_doc_type.clone(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DocType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Every registered type name (including the data type), sorted.
    pub fn names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// Types that produce rendered output.
    pub fn renderable(&self) -> impl Iterator<Item = &DocType> {
        self.types.values().filter(|t| t.template.is_some())
    }

    pub fn data_type(&self) -> &str {
        &self.data
    }

    pub fn is_data(&self, name: &str) -> bool {
        self.data == name
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
