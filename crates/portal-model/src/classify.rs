//! Path classification.
//!
//! Maps a site-relative path to the [`FileKind`] it plays in the content
//! model. Rules are tried in table order and the first match wins, so more
//! qualified suffixes (`.webpage.copy.html`) come before the generic ones
//! they would otherwise be confused with.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::entity::{CONTENT_PAGES_DIR, EntityType, SITE_FILE};

/// Role of a file within the site tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FileKind {
    Site,
    PageHead,
    PageCopy,
    PageSummary,
    PageScript,
    PageStyle,
    TemplateHead,
    TemplateSource,
    SnippetHead,
    SnippetValue,
    BasicFormHead,
    BasicFormScript,
    AdvancedForm,
    PageTemplate,
    List,
    WebFile,
    WebLinks,
    WebLinkSet,
    SiteSettings,
    SiteMarkers,
    Unknown,
}

/// How a rule matches a path.
#[derive(Clone, Copy, Debug)]
enum Pattern {
    /// Path ends with the suffix.
    Suffix(&'static str),
    /// Path is exactly this root-level file.
    RootFile(&'static str),
    /// A yaml file directly inside a set folder of the given directory.
    SetYaml(&'static str),
}

impl Pattern {
    fn matches(self, path: &str) -> bool {
        match self {
            Self::Suffix(suffix) => path.len() > suffix.len() && path.ends_with(suffix),
            Self::RootFile(name) => path == name,
            Self::SetYaml(dir) => {
                let parts: Vec<&str> = path.split('/').collect();
                parts.len() == 3
                    && parts[0] == dir
                    && parts[2].len() > ".yml".len()
                    && parts[2].ends_with(".yml")
            }
        }
    }
}

/// Classification rules in precedence order.
const RULES: &[(Pattern, FileKind)] = &[
    (Pattern::Suffix(".webpage.copy.html"), FileKind::PageCopy),
    (Pattern::Suffix(".webpage.summary.html"), FileKind::PageSummary),
    (Pattern::Suffix(".webpage.custom_javascript.js"), FileKind::PageScript),
    (Pattern::Suffix(".webpage.custom_css.css"), FileKind::PageStyle),
    (Pattern::Suffix(".webpage.yml"), FileKind::PageHead),
    (Pattern::Suffix(".webtemplate.source.html"), FileKind::TemplateSource),
    (Pattern::Suffix(".webtemplate.yml"), FileKind::TemplateHead),
    (Pattern::Suffix(".contentsnippet.value.html"), FileKind::SnippetValue),
    (Pattern::Suffix(".contentsnippet.yml"), FileKind::SnippetHead),
    (Pattern::Suffix(".basicform.custom_javascript.js"), FileKind::BasicFormScript),
    (Pattern::Suffix(".basicform.yml"), FileKind::BasicFormHead),
    (Pattern::Suffix(".advancedform.yml"), FileKind::AdvancedForm),
    (Pattern::Suffix(".pagetemplate.yml"), FileKind::PageTemplate),
    (Pattern::Suffix(".list.yml"), FileKind::List),
    (Pattern::Suffix(".webfile.yml"), FileKind::WebFile),
    (Pattern::Suffix(".weblink.yml"), FileKind::WebLinks),
    (Pattern::Suffix(".weblinkset.yml"), FileKind::WebLinkSet),
    (Pattern::SetYaml("weblink-sets"), FileKind::WebLinkSet),
    (Pattern::RootFile("sitesetting.yml"), FileKind::SiteSettings),
    (Pattern::RootFile("sitemarker.yml"), FileKind::SiteMarkers),
    (Pattern::RootFile(SITE_FILE), FileKind::Site),
];

/// Classify a site-relative path.
///
/// Total and pure: paths that match no rule (or are not valid UTF-8) are
/// [`FileKind::Unknown`].
#[must_use]
pub fn classify(path: &Path) -> FileKind {
    let Some(path) = normalize(path) else {
        return FileKind::Unknown;
    };

    RULES
        .iter()
        .find(|(pattern, _)| pattern.matches(&path))
        .map_or(FileKind::Unknown, |&(_, kind)| kind)
}

/// Join normal components with `/`, dropping `.` components.
fn normalize(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

impl FileKind {
    /// Entity type whose collection this file belongs to.
    ///
    /// `None` for the site record and unknown files.
    #[must_use]
    pub fn entity(self) -> Option<EntityType> {
        match self {
            Self::PageHead
            | Self::PageCopy
            | Self::PageSummary
            | Self::PageScript
            | Self::PageStyle => Some(EntityType::Page),
            Self::TemplateHead | Self::TemplateSource => Some(EntityType::Template),
            Self::SnippetHead | Self::SnippetValue => Some(EntityType::Snippet),
            Self::BasicFormHead | Self::BasicFormScript => Some(EntityType::BasicForm),
            Self::AdvancedForm => Some(EntityType::AdvancedForm),
            Self::PageTemplate => Some(EntityType::PageTemplate),
            Self::List => Some(EntityType::List),
            Self::WebFile => Some(EntityType::WebFile),
            Self::WebLinks => Some(EntityType::WebLink),
            Self::WebLinkSet => Some(EntityType::WebLinkSet),
            Self::SiteSettings => Some(EntityType::SiteSetting),
            Self::SiteMarkers => Some(EntityType::SiteMarker),
            Self::Site | Self::Unknown => None,
        }
    }

    /// Suffix a per-record file carries after the record's base path.
    fn record_suffix(self) -> Option<&'static str> {
        RULES.iter().find_map(|&(pattern, kind)| match pattern {
            Pattern::Suffix(suffix) if kind == self => Some(suffix),
            _ => None,
        })
    }

    /// Locator of the record a changed file belongs to.
    ///
    /// For composed records this is the base path with the kind's suffix
    /// stripped (`web-pages/home/home`). Set records are located by their
    /// folder. Whole-file kinds locate to the path itself. `None` if the
    /// path does not carry this kind's shape.
    #[must_use]
    pub fn locate(self, path: &Path) -> Option<PathBuf> {
        let normalized = normalize(path)?;
        match self {
            Self::Unknown => None,
            Self::Site | Self::SiteSettings | Self::SiteMarkers | Self::WebLinks => {
                Some(PathBuf::from(normalized))
            }
            Self::WebLinkSet => Path::new(&normalized).parent().map(Path::to_path_buf),
            _ => {
                let suffix = self.record_suffix()?;
                normalized
                    .strip_suffix(suffix)
                    .filter(|base| !base.is_empty())
                    .map(PathBuf::from)
            }
        }
    }
}

/// Page record owning a content-page locator.
///
/// `web-pages/home/content-pages/home.en-US` belongs to
/// `web-pages/home/home`. Returns `None` for anything else.
pub(crate) fn owning_page(locator: &Path) -> Option<PathBuf> {
    let parts: Vec<&str> = locator.iter().filter_map(|p| p.to_str()).collect();
    match parts.as_slice() {
        [root, page, dir, _]
            if Path::new(root) == EntityType::Page.source_path() && *dir == CONTENT_PAGES_DIR =>
        {
            Some(EntityType::Page.source_path().join(page).join(page))
        }
        _ => None,
    }
}
