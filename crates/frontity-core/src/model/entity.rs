// ── Normalized WordPress entities ──
//
// Raw REST objects split into flat `(type, id)` entities. Embedded
// resources (`_embed=true`) become entities of their own: authors,
// featured media and terms.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::link::LinkNormalizer;

/// Entity type of users.
pub const AUTHOR_TYPE: &str = "author";
/// Entity type of media items.
pub const ATTACHMENT_TYPE: &str = "attachment";
/// Entity type of post-type metadata (`/wp/v2/types`).
pub const POST_TYPE_TYPE: &str = "type";
/// Entity type of taxonomy metadata (`/wp/v2/taxonomies`).
pub const TAXONOMY_TYPE: &str = "taxonomy";

/// Identity of an entity in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: u64,
}

impl EntityKey {
    pub fn new(entity_type: impl Into<String>, id: u64) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// A normalized entity: identity, site-relative link and the remaining
/// REST fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: u64,
    /// Canonical site-relative link, when the object has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub fields: Map<String, Value>,
}

impl Entity {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type.clone(), self.id)
    }

    /// A field as a string (`slug`, `status`, ...).
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// A `{ "rendered": ... }` field such as `title` or `content`.
    pub fn rendered(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.get("rendered"))
            .and_then(Value::as_str)
    }

    pub fn slug(&self) -> Option<&str> {
        self.str_field("slug")
    }

    /// Shallow merge: fields of `other` overwrite ours, the rest stays.
    pub fn merge(&mut self, other: Entity) {
        for (k, v) in other.fields {
            self.fields.insert(k, v);
        }
        if other.link.is_some() {
            self.link = other.link;
        }
    }
}

/// The entity type of a REST object.
///
/// Posts carry `type`, terms carry `taxonomy` (`post_tag` is stored as
/// `tag`), users carry neither and fall back to `fallback`.
pub fn entity_type_of(value: &Value, fallback: &str) -> String {
    if let Some(taxonomy) = value.get("taxonomy").and_then(Value::as_str) {
        return match taxonomy {
            "post_tag" => "tag".into(),
            other => other.into(),
        };
    }
    value
        .get("type")
        .and_then(Value::as_str)
        .map_or_else(|| fallback.to_owned(), ToOwned::to_owned)
}

/// Split a REST object into entities: the object itself first, then its
/// embedded authors, featured media and terms.
///
/// Objects without a numeric `id` are skipped.
pub fn extract_entities(value: &Value, fallback: &str, links: &LinkNormalizer) -> Vec<Entity> {
    let mut out = Vec::new();
    let Some(object) = value.as_object() else {
        return out;
    };
    let Some(id) = object.get("id").and_then(Value::as_u64) else {
        return out;
    };

    let mut fields = object.clone();
    let embedded = fields.remove("_embedded");
    fields.remove("_links");

    let link = fields
        .get("link")
        .and_then(Value::as_str)
        .and_then(|l| links.normalize(l).ok());

    out.push(Entity {
        entity_type: entity_type_of(value, fallback),
        id,
        link,
        fields,
    });

    if let Some(Value::Object(embedded)) = embedded {
        if let Some(Value::Array(authors)) = embedded.get("author") {
            for author in authors {
                out.extend(extract_entities(author, AUTHOR_TYPE, links));
            }
        }
        if let Some(Value::Array(media)) = embedded.get("wp:featuredmedia") {
            for item in media {
                out.extend(extract_entities(item, ATTACHMENT_TYPE, links));
            }
        }
        // `wp:term` is an array per taxonomy.
        if let Some(Value::Array(groups)) = embedded.get("wp:term") {
            for term in groups.iter().filter_map(Value::as_array).flatten() {
                out.extend(extract_entities(term, "term", links));
            }
        }
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use url::Url;

    fn links() -> LinkNormalizer {
        LinkNormalizer::new(Url::parse("https://test.frontity.org/").unwrap())
    }

    #[test]
    fn post_with_embedded_resources() {
        let post = json!({
            "id": 60,
            "type": "post",
            "slug": "the-beauties-of-gullfoss",
            "link": "https://test.frontity.org/2016/the-beauties-of-gullfoss/",
            "_links": { "self": [] },
            "_embedded": {
                "author": [{ "id": 4, "slug": "alan", "link": "https://test.frontity.org/author/alan/" }],
                "wp:featuredmedia": [{ "id": 62, "type": "attachment", "slug": "gullfoss" }],
                "wp:term": [
                    [{ "id": 7, "taxonomy": "category", "slug": "nature" }],
                    [{ "id": 10, "taxonomy": "post_tag", "slug": "iceland" }]
                ]
            }
        });

        let entities = extract_entities(&post, "post", &links());
        let keys: Vec<String> = entities.iter().map(|e| e.key().to_string()).collect();
        assert_eq!(
            keys,
            ["post:60", "author:4", "attachment:62", "category:7", "tag:10"]
        );

        let stored = &entities[0];
        assert_eq!(stored.link.as_deref(), Some("/2016/the-beauties-of-gullfoss/"));
        assert!(!stored.fields.contains_key("_embedded"));
        assert!(!stored.fields.contains_key("_links"));
        assert_eq!(entities[1].link.as_deref(), Some("/author/alan/"));
    }

    #[test]
    fn objects_without_id_are_skipped() {
        assert!(extract_entities(&json!({ "slug": "x" }), "post", &links()).is_empty());
        assert!(extract_entities(&json!([1, 2]), "post", &links()).is_empty());
    }

    #[test]
    fn merge_is_shallow_last_write_wins() {
        let mut a = Entity {
            entity_type: "post".into(),
            id: 1,
            link: Some("/hello-world/".into()),
            fields: json!({ "title": { "rendered": "Hello" }, "sticky": true })
                .as_object()
                .cloned()
                .unwrap(),
        };
        let b = Entity {
            entity_type: "post".into(),
            id: 1,
            link: None,
            fields: json!({ "title": { "rendered": "Hello (edited)" } })
                .as_object()
                .cloned()
                .unwrap(),
        };
        a.merge(b);
        assert_eq!(a.rendered("title"), Some("Hello (edited)"));
        assert_eq!(a.fields["sticky"], true);
        assert_eq!(a.link.as_deref(), Some("/hello-world/"));
    }
}
