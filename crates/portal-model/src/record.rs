//! Loaded records.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::entity::{EntityType, LABEL_ATTRIBUTE, SITE_ID_ATTRIBUTE};

/// Attribute bag parsed from a yaml mapping.
pub type Attributes = Map<String, Value>;

/// A file that contributed to a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordFile {
    /// Site-relative path.
    pub path: PathBuf,
    /// Attribute the file's text was merged into, `None` for the head file.
    pub attribute: Option<&'static str>,
}

/// One logical content item, possibly composed from several files.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    entity: EntityType,
    locator: PathBuf,
    attributes: Attributes,
    files: Vec<RecordFile>,
    content_pages: Vec<Record>,
}

impl Record {
    pub(crate) fn new(entity: EntityType, locator: PathBuf, attributes: Attributes) -> Self {
        Self {
            entity,
            locator,
            attributes,
            files: Vec::new(),
            content_pages: Vec::new(),
        }
    }

    pub(crate) fn push_file(&mut self, path: PathBuf, attribute: Option<&'static str>) {
        self.files.push(RecordFile { path, attribute });
    }

    pub(crate) fn set_content_pages(&mut self, pages: Vec<Record>) {
        self.content_pages = pages;
    }

    pub(crate) fn insert(&mut self, key: &str, value: Value) {
        self.attributes.insert(key.to_owned(), value);
    }

    /// Entity type of the owning collection.
    #[must_use]
    pub fn entity(&self) -> EntityType {
        self.entity
    }

    /// Path the record was loaded from (base path, set folder or array file).
    #[must_use]
    pub fn locator(&self) -> &Path {
        &self.locator
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Attribute value by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// String attribute by name.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Identity attribute value.
    #[must_use]
    pub fn identity(&self) -> Option<&Value> {
        self.get(self.entity.identity_attribute())
    }

    /// Identity rendered as a string (strings as-is, numbers formatted).
    #[must_use]
    pub fn identity_string(&self) -> Option<String> {
        self.identity().and_then(value_to_string)
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.text(LABEL_ATTRIBUTE)
    }

    /// Site foreign key stamped at load time.
    #[must_use]
    pub fn site_id(&self) -> Option<&Value> {
        self.get(SITE_ID_ATTRIBUTE)
    }

    /// Files that composed this record, head file first.
    #[must_use]
    pub fn files(&self) -> &[RecordFile] {
        &self.files
    }

    /// Nested content pages (pages only).
    #[must_use]
    pub fn content_pages(&self) -> &[Record] {
        &self.content_pages
    }

    /// File a reference to this record points at.
    ///
    /// The attachment named by [`EntityType::primary_attribute`] if present,
    /// otherwise the head file.
    #[must_use]
    pub fn primary_file(&self) -> Option<&RecordFile> {
        let attachment = self
            .entity
            .primary_attribute()
            .and_then(|attr| self.files.iter().find(|f| f.attribute == Some(attr)));
        attachment.or_else(|| self.files.iter().find(|f| f.attribute.is_none()))
    }

    /// Text attachments with their content.
    pub fn text_attachments(&self) -> impl Iterator<Item = (&RecordFile, &str)> {
        self.files
            .iter()
            .filter_map(|f| Some((f, self.text(f.attribute?)?)))
    }
}

/// The root site record.
#[derive(Clone, Debug, PartialEq)]
pub struct Site {
    id: Value,
    attributes: Attributes,
}

impl Site {
    pub(crate) fn new(id: Value, attributes: Attributes) -> Self {
        Self { id, attributes }
    }

    /// Site identity, stamped on every record as a foreign key.
    #[must_use]
    pub fn id(&self) -> &Value {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.attributes.get(LABEL_ATTRIBUTE).and_then(Value::as_str)
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Render a scalar identity or label as a string.
pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn snippet() -> Record {
        let Value::Object(attributes) = json!({
            "adx_contentsnippetid": "5555",
            "adx_name": "greeting",
            "adx_value": "<p>Hello</p>",
        }) else {
            unreachable!()
        };
        let mut record = Record::new(
            EntityType::Snippet,
            PathBuf::from("content-snippets/greeting/greeting"),
            attributes,
        );
        record.push_file(
            PathBuf::from("content-snippets/greeting/greeting.contentsnippet.yml"),
            None,
        );
        record.push_file(
            PathBuf::from("content-snippets/greeting/greeting.contentsnippet.value.html"),
            Some("adx_value"),
        );
        record
    }

    #[test]
    fn test_identity_and_label() {
        let record = snippet();

        assert_eq!(record.identity(), Some(&json!("5555")));
        assert_eq!(record.identity_string().as_deref(), Some("5555"));
        assert_eq!(record.label(), Some("greeting"));
    }

    #[test]
    fn test_primary_file_prefers_primary_attachment() {
        let record = snippet();

        assert_eq!(
            record.primary_file().map(|f| f.path.as_path()),
            Some(Path::new(
                "content-snippets/greeting/greeting.contentsnippet.value.html"
            ))
        );
    }

    #[test]
    fn test_primary_file_falls_back_to_head() {
        let mut record = Record::new(EntityType::List, PathBuf::from("lists/orders"), Map::new());
        record.push_file(PathBuf::from("lists/orders.list.yml"), None);

        assert_eq!(
            record.primary_file().map(|f| f.path.as_path()),
            Some(Path::new("lists/orders.list.yml"))
        );
    }

    #[test]
    fn test_text_attachments() {
        let record = snippet();

        let attachments: Vec<_> = record
            .text_attachments()
            .map(|(f, text)| (f.attribute, text))
            .collect();

        assert_eq!(attachments, vec![(Some("adx_value"), "<p>Hello</p>")]);
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!(42)).as_deref(), Some("42"));
        assert_eq!(value_to_string(&json!(null)), None);
    }
}
