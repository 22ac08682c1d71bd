// ── Data descriptors ──
//
// The public read model: one descriptor per canonical link, holding status
// flags and *references* (type + id) to entities in the entity store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::link::Link;

/// Reference from an archive to one of its entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: u64,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub link: String,
}

/// Which archive a listing is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "archive", rename_all = "camelCase")]
pub enum ArchiveKind {
    /// Custom taxonomy term.
    Taxonomy { taxonomy: String, id: u64 },
    Category { id: u64 },
    Tag { id: u64 },
    Author { id: u64 },
    /// Archive of a custom post type.
    PostTypeArchive {
        #[serde(rename = "type")]
        post_type: String,
    },
    /// The posts archive (`/`).
    PostArchive { is_home: bool },
    Date {
        year: i32,
        month: Option<u32>,
        day: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveData {
    #[serde(flatten)]
    pub kind: ArchiveKind,
    pub items: Vec<ItemRef>,
    pub total: Option<u64>,
    pub total_pages: Option<u64>,
    /// Search query when the archive is filtered with `?s=`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Flavour of a single-entity descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PostKind {
    Post,
    Page,
    Attachment,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTypeData {
    #[serde(rename = "type")]
    pub post_type: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_preview: bool,
}

impl PostTypeData {
    pub fn kind(&self) -> PostKind {
        match self.post_type.as_str() {
            "post" => PostKind::Post,
            "page" => PostKind::Page,
            "attachment" => PostKind::Attachment,
            _ => PostKind::Custom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    pub error_status: u16,
    pub error_status_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectionData {
    /// Target link (site-relative) or absolute URL when external.
    pub location: String,
    pub redirect_status: Option<u16>,
    pub is_external: bool,
}

/// Variant-specific part of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DataKind {
    /// Only status flags: not fetched yet, or fetching.
    Status,
    Error(ErrorData),
    Archive(ArchiveData),
    PostType(PostTypeData),
    Redirection(RedirectionData),
}

/// The descriptor stored for one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub link: String,
    pub route: String,
    pub page: u32,
    pub query: BTreeMap<String, String>,
    pub is_fetching: bool,
    pub is_ready: bool,
    #[serde(flatten)]
    pub kind: DataKind,
}

impl Data {
    /// The status-only shape for a link nobody has fetched.
    pub fn status(link: &Link) -> Self {
        Self {
            link: link.key(),
            route: link.path.clone(),
            page: link.page,
            query: link.query.clone(),
            is_fetching: false,
            is_ready: false,
            kind: DataKind::Status,
        }
    }

    /// Status-only descriptor for a raw string that could not be parsed.
    pub fn unparsed(raw: &str) -> Self {
        Self {
            link: raw.to_owned(),
            route: raw.to_owned(),
            page: 1,
            query: BTreeMap::new(),
            is_fetching: false,
            is_ready: false,
            kind: DataKind::Status,
        }
    }

    pub fn fetching(mut self) -> Self {
        self.is_fetching = true;
        self.is_ready = false;
        self
    }

    /// Replace the variant and settle the flags.
    pub fn settled(mut self, kind: DataKind) -> Self {
        self.is_fetching = false;
        self.is_ready = true;
        self.kind = kind;
        self
    }

    /// An error descriptor (ready, not fetching).
    pub fn error(self, status: u16, status_text: impl Into<String>) -> Self {
        self.settled(DataKind::Error(ErrorData {
            error_status: status,
            error_status_text: status_text.into(),
        }))
    }

    /// A redirection descriptor. Not ready: the target still has to be
    /// resolved by whoever follows it.
    pub fn redirection(mut self, redirection: RedirectionData) -> Self {
        self.is_fetching = false;
        self.is_ready = false;
        self.kind = DataKind::Redirection(redirection);
        self
    }

    // ── Tag tests ────────────────────────────────────────────────────

    pub fn is_error(&self) -> bool {
        matches!(self.kind, DataKind::Error(_))
    }

    pub fn is_404(&self) -> bool {
        matches!(self.kind, DataKind::Error(ref e) if e.error_status == 404)
    }

    pub fn is_redirection(&self) -> bool {
        matches!(self.kind, DataKind::Redirection(_))
    }

    pub fn is_archive(&self) -> bool {
        matches!(self.kind, DataKind::Archive(_))
    }

    pub fn is_post_type(&self) -> bool {
        matches!(self.kind, DataKind::PostType(_))
    }

    pub fn is_search(&self) -> bool {
        matches!(self.kind, DataKind::Archive(ref a) if a.search.is_some())
    }

    pub fn is_home(&self) -> bool {
        matches!(
            self.kind,
            DataKind::Archive(ArchiveData {
                kind: ArchiveKind::PostArchive { is_home: true },
                ..
            })
        )
    }

    // ── Variant accessors ────────────────────────────────────────────

    pub fn as_error(&self) -> Option<&ErrorData> {
        match self.kind {
            DataKind::Error(ref e) => Some(e),
            _ => None,
        }
    }

    pub fn as_redirection(&self) -> Option<&RedirectionData> {
        match self.kind {
            DataKind::Redirection(ref r) => Some(r),
            _ => None,
        }
    }

    pub fn as_archive(&self) -> Option<&ArchiveData> {
        match self.kind {
            DataKind::Archive(ref a) => Some(a),
            _ => None,
        }
    }

    pub fn as_post_type(&self) -> Option<&PostTypeData> {
        match self.kind {
            DataKind::PostType(ref p) => Some(p),
            _ => None,
        }
    }

    /// Entities this descriptor points at, as `(type, id)` pairs.
    pub fn references(&self) -> Vec<(&str, u64)> {
        match self.kind {
            DataKind::Archive(ref a) => a
                .items
                .iter()
                .map(|i| (i.entity_type.as_str(), i.id))
                .collect(),
            DataKind::PostType(ref p) => vec![(p.post_type.as_str(), p.id)],
            DataKind::Status | DataKind::Error(_) | DataKind::Redirection(_) => Vec::new(),
        }
    }
}
