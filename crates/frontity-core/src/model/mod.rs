// ── Domain model ──

pub mod data;
pub mod entity;

pub use data::{
    ArchiveData, ArchiveKind, Data, DataKind, ErrorData, ItemRef, PostKind, PostTypeData,
    RedirectionData,
};
pub use entity::{
    ATTACHMENT_TYPE, AUTHOR_TYPE, Entity, EntityKey, POST_TYPE_TYPE, TAXONOMY_TYPE,
    entity_type_of, extract_entities,
};
