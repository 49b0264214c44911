//! Entity types and their composition rules.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Attribute holding a record's display label.
pub const LABEL_ATTRIBUTE: &str = "adx_name";

/// Site identity attribute, also used as the foreign key on every record.
pub const SITE_ID_ATTRIBUTE: &str = "adx_websiteid";

/// Site record file at the tree root.
pub const SITE_FILE: &str = "website.yml";

/// Content type of a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EntityType {
    Page,
    Template,
    Snippet,
    PageTemplate,
    BasicForm,
    AdvancedForm,
    List,
    WebLinkSet,
    WebLink,
    SiteSetting,
    SiteMarker,
    WebFile,
}

/// Where the records of an entity type live and how they are composed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Layout {
    /// `<dir>/<name>/<name><head>` plus attachments, one folder per record.
    Folder { dir: &'static str, head: &'static str },
    /// `<dir>/<name><head>`, one file per record.
    Files { dir: &'static str, head: &'static str },
    /// One yaml record per set folder under `<dir>`.
    SetFolder { dir: &'static str },
    /// `<dir>/<set>/*<suffix>` array files, entries flattened in order.
    SetArrays { dir: &'static str, suffix: &'static str },
    /// One array file at the root.
    FlatArray { file: &'static str },
}

/// A raw-text sibling merged into a record attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Attachment {
    pub suffix: &'static str,
    pub attribute: &'static str,
    pub required: bool,
}

const fn required(suffix: &'static str, attribute: &'static str) -> Attachment {
    Attachment {
        suffix,
        attribute,
        required: true,
    }
}

const fn optional(suffix: &'static str, attribute: &'static str) -> Attachment {
    Attachment {
        suffix,
        attribute,
        required: false,
    }
}

const PAGE_ATTACHMENTS: &[Attachment] = &[
    required(".webpage.copy.html", "adx_copy"),
    optional(".webpage.summary.html", "adx_summary"),
    optional(".webpage.custom_javascript.js", "adx_customjavascript"),
    optional(".webpage.custom_css.css", "adx_customcss"),
];

const TEMPLATE_ATTACHMENTS: &[Attachment] = &[required(".webtemplate.source.html", "adx_source")];

const SNIPPET_ATTACHMENTS: &[Attachment] = &[required(".contentsnippet.value.html", "adx_value")];

const BASIC_FORM_ATTACHMENTS: &[Attachment] = &[optional(
    ".basicform.custom_javascript.js",
    "adx_registerstartupscript",
)];

/// Folder holding the content pages of a page record.
pub(crate) const CONTENT_PAGES_DIR: &str = "content-pages";

impl EntityType {
    /// Every collection, in build and display order.
    pub const ALL: [Self; 12] = [
        Self::Page,
        Self::Template,
        Self::Snippet,
        Self::PageTemplate,
        Self::BasicForm,
        Self::AdvancedForm,
        Self::List,
        Self::WebLinkSet,
        Self::WebLink,
        Self::SiteSetting,
        Self::SiteMarker,
        Self::WebFile,
    ];

    /// Types that directives can reference, in the order the unused report
    /// lists them.
    pub const REFERENCEABLE: [Self; 5] = [
        Self::Snippet,
        Self::Template,
        Self::BasicForm,
        Self::AdvancedForm,
        Self::List,
    ];

    /// Human-readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Page => "Page",
            Self::Template => "Template",
            Self::Snippet => "Snippet",
            Self::PageTemplate => "Page Template",
            Self::BasicForm => "Basic Form",
            Self::AdvancedForm => "Advanced Form",
            Self::List => "List",
            Self::WebLinkSet => "Web Link Set",
            Self::WebLink => "Web Link",
            Self::SiteSetting => "Site Setting",
            Self::SiteMarker => "Site Marker",
            Self::WebFile => "Web File",
        }
    }

    /// Attribute that identifies a record within its collection.
    #[must_use]
    pub fn identity_attribute(self) -> &'static str {
        match self {
            Self::Page => "adx_webpageid",
            Self::Template => "adx_webtemplateid",
            Self::Snippet => "adx_contentsnippetid",
            Self::PageTemplate => "adx_pagetemplateid",
            Self::BasicForm => "adx_entityformid",
            Self::AdvancedForm => "adx_webformid",
            Self::List => "adx_entitylistid",
            Self::WebLinkSet => "adx_weblinksetid",
            Self::WebLink => "adx_weblinkid",
            Self::SiteSetting => "adx_sitesettingid",
            Self::SiteMarker => "adx_sitemarkerid",
            Self::WebFile => "adx_webfileid",
        }
    }

    /// True if a single record cannot be addressed from one of its files.
    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(
            self.layout(),
            Layout::SetArrays { .. } | Layout::FlatArray { .. }
        )
    }

    /// Directory or file (relative to the site root) holding the collection.
    #[must_use]
    pub fn source_path(self) -> &'static Path {
        let source = match self.layout() {
            Layout::Folder { dir, .. }
            | Layout::Files { dir, .. }
            | Layout::SetFolder { dir }
            | Layout::SetArrays { dir, .. } => dir,
            Layout::FlatArray { file } => file,
        };
        Path::new(source)
    }

    /// Attribute holding the content a reference to this type points at.
    ///
    /// `None` means the head file itself is the primary file.
    #[must_use]
    pub fn primary_attribute(self) -> Option<&'static str> {
        match self {
            Self::Page => Some("adx_copy"),
            Self::Template => Some("adx_source"),
            Self::Snippet => Some("adx_value"),
            _ => None,
        }
    }

    pub(crate) fn layout(self) -> Layout {
        match self {
            Self::Page => Layout::Folder {
                dir: "web-pages",
                head: ".webpage.yml",
            },
            Self::Template => Layout::Folder {
                dir: "web-templates",
                head: ".webtemplate.yml",
            },
            Self::Snippet => Layout::Folder {
                dir: "content-snippets",
                head: ".contentsnippet.yml",
            },
            Self::BasicForm => Layout::Folder {
                dir: "basic-forms",
                head: ".basicform.yml",
            },
            Self::AdvancedForm => Layout::Folder {
                dir: "advanced-forms",
                head: ".advancedform.yml",
            },
            Self::PageTemplate => Layout::Files {
                dir: "page-templates",
                head: ".pagetemplate.yml",
            },
            Self::List => Layout::Files {
                dir: "lists",
                head: ".list.yml",
            },
            Self::WebFile => Layout::Files {
                dir: "web-files",
                head: ".webfile.yml",
            },
            Self::WebLinkSet => Layout::SetFolder {
                dir: "weblink-sets",
            },
            Self::WebLink => Layout::SetArrays {
                dir: "weblink-sets",
                suffix: ".weblink.yml",
            },
            Self::SiteSetting => Layout::FlatArray {
                file: "sitesetting.yml",
            },
            Self::SiteMarker => Layout::FlatArray {
                file: "sitemarker.yml",
            },
        }
    }

    pub(crate) fn attachments(self) -> &'static [Attachment] {
        match self {
            Self::Page => PAGE_ATTACHMENTS,
            Self::Template => TEMPLATE_ATTACHMENTS,
            Self::Snippet => SNIPPET_ATTACHMENTS,
            Self::BasicForm => BASIC_FORM_ATTACHMENTS,
            _ => &[],
        }
    }

    /// Attribute renames applied to flat-array entries.
    pub(crate) fn renames(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::SiteMarker => &[("adx_pageid", "adx_webpageid")],
            _ => &[],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Append a suffix to a base path (`web-pages/home/home` + `.webpage.yml`).
pub(crate) fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}
