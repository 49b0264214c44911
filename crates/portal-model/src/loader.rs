//! Entity loading from storage.
//!
//! Provides [`EntityLoader`], which turns site files into [`Record`]s
//! according to each entity type's composition rule:
//!
//! - Folder records: a yaml head file plus raw-text siblings merged into the
//!   attributes the entity designates
//! - File records: one yaml file per record
//! - Arrays: one file holding many entries, each stamped with the site id
//!
//! Loads are plain reads of the current storage state; nothing is cached.
//! Record loads within a collection fan out over the rayon pool and are
//! collected in directory enumeration order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use portal_storage::{DirEntry, Storage};
use rayon::prelude::*;
use serde_json::Value;

use crate::entity::{
    Attachment, CONTENT_PAGES_DIR, EntityType, Layout, SITE_FILE, SITE_ID_ATTRIBUTE, with_suffix,
};
use crate::error::LoadError;
use crate::record::{Attributes, Record, Site, value_to_string};

/// Suffix of the set record inside a web link set folder.
const WEBLINK_SET_SUFFIX: &str = ".weblinkset.yml";

/// Loads records of every entity type from a [`Storage`].
#[derive(Clone, Copy)]
pub struct EntityLoader<'a> {
    storage: &'a dyn Storage,
}

impl<'a> EntityLoader<'a> {
    #[must_use]
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Load the site record from `website.yml`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] if the file is missing and
    /// [`LoadError::Parse`] if it is malformed or has no site identity.
    pub fn load_site(&self) -> Result<Site, LoadError> {
        let path = Path::new(SITE_FILE);
        let attributes = parse_mapping(path, &self.storage.read(path)?)?;
        let id = attributes
            .get(SITE_ID_ATTRIBUTE)
            .filter(|id| value_to_string(id).is_some())
            .cloned()
            .ok_or_else(|| LoadError::parse(path, format!("missing {SITE_ID_ATTRIBUTE}")))?;
        Ok(Site::new(id, attributes))
    }

    /// Load every record of one entity type.
    ///
    /// A missing category directory or array file yields an empty
    /// collection.
    ///
    /// # Errors
    ///
    /// Any record failure fails the whole collection. Duplicate identities
    /// are reported as [`LoadError::DuplicateIdentity`].
    pub fn load_collection(
        &self,
        entity: EntityType,
        site_id: &Value,
    ) -> Result<Vec<Record>, LoadError> {
        let records = match entity.layout() {
            Layout::Folder { dir, .. } => {
                let locators = self
                    .list_or_empty(Path::new(dir))?
                    .into_iter()
                    .filter(DirEntry::is_dir)
                    .map(|e| Path::new(dir).join(&e.name).join(&e.name))
                    .collect();
                self.load_records(entity, locators, site_id)?
            }
            Layout::Files { dir, head } => {
                let locators = self.head_locators(Path::new(dir), head)?;
                self.load_records(entity, locators, site_id)?
            }
            Layout::SetFolder { dir } => {
                let locators = self.set_folders(dir)?;
                self.load_records(entity, locators, site_id)?
            }
            Layout::SetArrays { dir, suffix } => {
                let mut files = Vec::new();
                for set in self.set_folders(dir)? {
                    files.extend(
                        self.storage
                            .list(&set)?
                            .into_iter()
                            .filter(|e| e.is_file() && e.name.ends_with(suffix))
                            .map(|e| set.join(e.name)),
                    );
                }
                let arrays = files
                    .par_iter()
                    .map(|file| self.load_array(entity, file, site_id))
                    .collect::<Result<Vec<_>, _>>()?;
                arrays.into_iter().flatten().collect()
            }
            Layout::FlatArray { file } => match self.load_array(entity, Path::new(file), site_id) {
                Err(LoadError::NotFound(_)) => Vec::new(),
                result => result?,
            },
        };

        check_unique(entity, &records)?;
        tracing::debug!(entity = %entity, count = records.len(), "Loaded collection");
        Ok(records)
    }

    /// Load one record addressed by its locator.
    ///
    /// The locator is the base path for composed records
    /// (`web-pages/home/home`, `lists/orders`) and the set folder for web
    /// link sets.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] if a required file is missing and
    /// [`LoadError::NotAddressable`] for array entity types.
    pub fn load_record(
        &self,
        entity: EntityType,
        locator: &Path,
        site_id: &Value,
    ) -> Result<Record, LoadError> {
        match entity.layout() {
            Layout::Folder { head, .. } | Layout::Files { head, .. } => {
                let mut record = self.compose(entity, locator, head, site_id)?;
                if entity == EntityType::Page {
                    record.set_content_pages(self.load_content_pages(locator, head, site_id)?);
                }
                Ok(record)
            }
            Layout::SetFolder { .. } => self.load_set(entity, locator, site_id),
            Layout::SetArrays { .. } | Layout::FlatArray { .. } => {
                Err(LoadError::NotAddressable(entity))
            }
        }
    }

    fn load_records(
        &self,
        entity: EntityType,
        locators: Vec<PathBuf>,
        site_id: &Value,
    ) -> Result<Vec<Record>, LoadError> {
        locators
            .par_iter()
            .map(|locator| self.load_record(entity, locator, site_id))
            .collect()
    }

    /// Read the head file and every attachment of one composed record.
    fn compose(
        &self,
        entity: EntityType,
        base: &Path,
        head: &str,
        site_id: &Value,
    ) -> Result<Record, LoadError> {
        let head_path = with_suffix(base, head);
        let attributes = parse_mapping(&head_path, &self.storage.read(&head_path)?)?;
        let mut record = Record::new(entity, base.to_path_buf(), attributes);
        record.push_file(head_path, None);

        for attachment in entity.attachments() {
            let path = with_suffix(base, attachment.suffix);
            if let Some(text) = self.read_attachment(&path, attachment)? {
                record.insert(attachment.attribute, Value::String(text));
                record.push_file(path, Some(attachment.attribute));
            }
        }

        record.insert(SITE_ID_ATTRIBUTE, site_id.clone());
        Ok(record)
    }

    fn read_attachment(
        &self,
        path: &Path,
        attachment: &Attachment,
    ) -> Result<Option<String>, LoadError> {
        match self.storage.read(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.is_not_found() && !attachment.required => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Content pages under `<page folder>/content-pages/`.
    fn load_content_pages(
        &self,
        page: &Path,
        head: &str,
        site_id: &Value,
    ) -> Result<Vec<Record>, LoadError> {
        let Some(folder) = page.parent() else {
            return Ok(Vec::new());
        };
        let locators = self.head_locators(&folder.join(CONTENT_PAGES_DIR), head)?;
        locators
            .par_iter()
            .map(|locator| self.compose(EntityType::Page, locator, head, site_id))
            .collect()
    }

    /// Web link set record from its folder.
    fn load_set(
        &self,
        entity: EntityType,
        folder: &Path,
        site_id: &Value,
    ) -> Result<Record, LoadError> {
        let entries = self.storage.list(folder)?;
        let name = folder.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let preferred = format!("{name}{WEBLINK_SET_SUFFIX}");

        let file = entries
            .iter()
            .find(|e| e.is_file() && e.name == preferred)
            .or_else(|| {
                entries.iter().find(|e| {
                    e.is_file() && e.name.ends_with(".yml") && !e.name.ends_with(".weblink.yml")
                })
            })
            .map(|e| folder.join(&e.name))
            .ok_or_else(|| LoadError::NotFound(folder.join(&preferred)))?;

        let attributes = parse_mapping(&file, &self.storage.read(&file)?)?;
        let mut record = Record::new(entity, folder.to_path_buf(), attributes);
        record.push_file(file, None);
        record.insert(SITE_ID_ATTRIBUTE, site_id.clone());
        Ok(record)
    }

    /// Entries of one array file, renamed and stamped.
    fn load_array(
        &self,
        entity: EntityType,
        file: &Path,
        site_id: &Value,
    ) -> Result<Vec<Record>, LoadError> {
        let entries = match parse_yaml(file, &self.storage.read(file)?)? {
            Value::Array(entries) => entries,
            Value::Null => Vec::new(),
            _ => return Err(LoadError::parse(file, "expected a list of entries")),
        };

        entries
            .into_iter()
            .map(|entry| {
                let Value::Object(mut attributes) = entry else {
                    return Err(LoadError::parse(file, "expected every entry to be a mapping"));
                };
                for &(from, to) in entity.renames() {
                    if let Some(value) = attributes.remove(from) {
                        attributes.insert(to.to_owned(), value);
                    }
                }
                let mut record = Record::new(entity, file.to_path_buf(), attributes);
                record.push_file(file.to_path_buf(), None);
                record.insert(SITE_ID_ATTRIBUTE, site_id.clone());
                Ok(record)
            })
            .collect()
    }

    /// Base paths of `<dir>/<name><head>` files.
    fn head_locators(&self, dir: &Path, head: &str) -> Result<Vec<PathBuf>, LoadError> {
        Ok(self
            .list_or_empty(dir)?
            .into_iter()
            .filter(DirEntry::is_file)
            .filter_map(|e| {
                let base = e.name.strip_suffix(head).filter(|b| !b.is_empty())?;
                Some(dir.join(base))
            })
            .collect())
    }

    fn set_folders(&self, dir: &str) -> Result<Vec<PathBuf>, LoadError> {
        Ok(self
            .list_or_empty(Path::new(dir))?
            .into_iter()
            .filter(DirEntry::is_dir)
            .map(|e| Path::new(dir).join(e.name))
            .collect())
    }

    /// List a directory, treating a missing one as empty.
    fn list_or_empty(&self, dir: &Path) -> Result<Vec<DirEntry>, LoadError> {
        match self.storage.list(dir) {
            Ok(entries) => Ok(entries),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_yaml(path: &Path, text: &str) -> Result<Value, LoadError> {
    serde_yaml::from_str(text).map_err(|e| LoadError::parse(path, e.to_string()))
}

fn parse_mapping(path: &Path, text: &str) -> Result<Attributes, LoadError> {
    match parse_yaml(path, text)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Attributes::new()),
        _ => Err(LoadError::parse(path, "expected a mapping")),
    }
}

fn check_unique(entity: EntityType, records: &[Record]) -> Result<(), LoadError> {
    let mut seen = HashSet::new();
    for id in records.iter().filter_map(Record::identity_string) {
        if !seen.insert(id.clone()) {
            return Err(LoadError::DuplicateIdentity { entity, id });
        }
    }
    Ok(())
}
