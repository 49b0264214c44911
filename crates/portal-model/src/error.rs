//! Error types for loading and synchronization.

use std::path::{Path, PathBuf};

use portal_storage::{StorageError, StorageErrorKind};

use crate::classify::FileKind;
use crate::entity::EntityType;

/// Error returned when a record or collection fails to load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A required file or directory is missing.
    #[error("Required file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Structured data is malformed or has the wrong shape.
    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    /// Two records of one collection share an identity.
    #[error("Duplicate {entity} identity: {id}")]
    DuplicateIdentity { entity: EntityType, id: String },
    /// Records of this type can only be loaded as a whole collection.
    #[error("{0} records cannot be loaded individually")]
    NotAddressable(EntityType),
    /// Storage backend failure other than a missing file.
    #[error(transparent)]
    Storage(StorageError),
}

impl LoadError {
    /// True for [`LoadError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub(crate) fn parse(path: &Path, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl From<StorageError> for LoadError {
    fn from(e: StorageError) -> Self {
        match e.kind() {
            StorageErrorKind::NotFound => {
                Self::NotFound(e.path().map(Path::to_path_buf).unwrap_or_default())
            }
            _ => Self::Storage(e),
        }
    }
}

/// Error returned when applying a change notification fails.
///
/// The store keeps its previous state whenever one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A change arrived before the store was built.
    #[error("Content store is not initialized")]
    Uninitialized,
    /// The site record could not be (re)loaded.
    #[error("Failed to load site: {0}")]
    Site(#[source] LoadError),
    /// Reloading a record or collection failed.
    #[error("Failed to reload {entity}: {source}")]
    Reload {
        entity: EntityType,
        #[source]
        source: LoadError,
    },
    /// A classified path does not carry the shape of its own kind.
    #[error("Path {} does not match its classification {kind:?}", path.display())]
    AmbiguousClassification { path: PathBuf, kind: FileKind },
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(LoadError: Send, Sync);
    static_assertions::assert_impl_all!(SyncError: Send, Sync);

    #[test]
    fn test_storage_not_found_maps_to_not_found() {
        let err: LoadError = StorageError::not_found("lists/a.list.yml").into();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Required file not found: lists/a.list.yml");
    }

    #[test]
    fn test_other_storage_errors_are_wrapped() {
        let err: LoadError = StorageError::new(StorageErrorKind::PermissionDenied).into();

        assert!(matches!(err, LoadError::Storage(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_reload_error_message() {
        let err = SyncError::Reload {
            entity: EntityType::List,
            source: LoadError::parse(Path::new("lists/a.list.yml"), "bad indent"),
        };

        assert_eq!(
            err.to_string(),
            "Failed to reload List: Failed to parse lists/a.list.yml: bad indent"
        );
    }
}
