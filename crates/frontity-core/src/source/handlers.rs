// ── Route handlers ──
//
// Map a canonical link to WordPress REST requests by path shape and turn
// the answers into a descriptor variant. Matching is first-wins:
//
//   /?p=ID, /?page_id=ID          single entity by id (previews)
//   /?post_type=T&p=ID            custom post type entity by id
//   /                             posts archive (home, search)
//   /<category_base>/.../<slug>/  category archive
//   /<tag_base>/<slug>/           tag archive
//   /<author_base>/<slug>/        author archive
//   /YYYY/[MM/[DD/]]              date archive
//   /<taxonomy>/.../<slug>/       custom taxonomy archive
//   /<post type archive>/         custom post type archive
//   anything else                 single entity by slug

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use frontity_api::ListParams;
use serde_json::Value;
use tracing::{debug, warn};

use super::Source;
use crate::config::{PostTypeConfig, TaxonomyConfig};
use crate::error::CoreError;
use crate::link::Link;
use crate::model::{
    ArchiveData, ArchiveKind, AUTHOR_TYPE, DataKind, ItemRef, POST_TYPE_TYPE, PostTypeData,
    TAXONOMY_TYPE,
};

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Fields of a revision that must not overwrite the previewed entity.
const REVISION_SKIP: [&str; 5] = ["id", "parent", "type", "link", "_links"];

pub(crate) async fn resolve(source: &Source, link: &Link) -> Result<DataKind, CoreError> {
    let config = source.config();

    if let Some((post_type, id)) = id_query(source, link) {
        let post_type = post_type.ok_or_else(|| not_found(link))?;
        return by_id(source, link, &post_type, id).await;
    }

    let segments = link.segments();
    match segments.as_slice() {
        [] => {
            archive(
                source,
                link,
                "posts",
                ListParams::page(link.page),
                "post",
                ArchiveKind::PostArchive { is_home: true },
            )
            .await
        }
        [base, .., slug] if *base == config.category_base => {
            let route = TermRoute {
                terms_endpoint: "categories",
                filter_param: "categories",
                list_endpoint: "posts",
                entity_type: "category",
            };
            term_archive(source, link, &route, slug, |id| ArchiveKind::Category { id }).await
        }
        [base, slug] if *base == config.tag_base => {
            let route = TermRoute {
                terms_endpoint: "tags",
                filter_param: "tags",
                list_endpoint: "posts",
                entity_type: "tag",
            };
            term_archive(source, link, &route, slug, |id| ArchiveKind::Tag { id }).await
        }
        [base, slug] if *base == config.author_base => author_archive(source, link, slug).await,
        _ => {
            if let Some((year, month, day)) = date_parts(&segments) {
                return date_archive(source, link, year, month, day).await;
            }
            if let Some((taxonomy, slug)) = custom_taxonomy(source, &segments) {
                return taxonomy_archive(source, link, taxonomy, slug).await;
            }
            if let Some(kind) = post_type_archive(source, link).await {
                return kind;
            }
            by_slug(source, link).await
        }
    }
}

// ── Archives ─────────────────────────────────────────────────────────

/// List `endpoint` for the link's page, with the search query if any.
async fn archive(
    source: &Source,
    link: &Link,
    endpoint: &str,
    mut params: ListParams,
    fallback_type: &str,
    kind: ArchiveKind,
) -> Result<DataKind, CoreError> {
    params.page = link.page;
    params.per_page = source.config().per_page;
    let search = link.query.get("s").filter(|s| !s.is_empty()).cloned();
    if let Some(ref search) = search {
        params = params.with_search(search.clone());
    }

    let resp = source.client().list(endpoint, &params).await?;
    let items = source.merge_items(&resp.data, fallback_type);
    debug!(link = %link, endpoint, items = items.len(), total = ?resp.total, "archive fetched");

    Ok(DataKind::Archive(ArchiveData {
        kind,
        items,
        total: resp.total,
        total_pages: resp.total_pages,
        search,
    }))
}

struct TermRoute<'a> {
    terms_endpoint: &'a str,
    /// Query parameter filtering the listing by term id.
    filter_param: &'a str,
    list_endpoint: &'a str,
    entity_type: &'a str,
}

async fn term_archive(
    source: &Source,
    link: &Link,
    route: &TermRoute<'_>,
    slug: &str,
    kind: impl FnOnce(u64) -> ArchiveKind,
) -> Result<DataKind, CoreError> {
    let terms = source
        .client()
        .find_by_slug(route.terms_endpoint, slug)
        .await?;
    let term = pick_by_link(source, &terms, link).ok_or_else(|| not_found(link))?;
    let term_ref = source
        .merge_value(term, route.entity_type)
        .ok_or_else(|| not_found(link))?;

    archive(
        source,
        link,
        route.list_endpoint,
        ListParams::page(link.page).with_term(route.filter_param, term_ref.id),
        "post",
        kind(term_ref.id),
    )
    .await
}

async fn author_archive(source: &Source, link: &Link, slug: &str) -> Result<DataKind, CoreError> {
    let users = source.client().find_by_slug("users", slug).await?;
    let user = users.first().ok_or_else(|| not_found(link))?;
    let author = source
        .merge_value(user, AUTHOR_TYPE)
        .ok_or_else(|| not_found(link))?;

    archive(
        source,
        link,
        "posts",
        ListParams::page(link.page).with_author(author.id),
        "post",
        ArchiveKind::Author { id: author.id },
    )
    .await
}

async fn date_archive(
    source: &Source,
    link: &Link,
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
) -> Result<DataKind, CoreError> {
    let (after, before) = date_range(year, month, day).ok_or_else(|| not_found(link))?;
    archive(
        source,
        link,
        "posts",
        ListParams::page(link.page).with_date_range(after, before),
        "post",
        ArchiveKind::Date { year, month, day },
    )
    .await
}

async fn taxonomy_archive(
    source: &Source,
    link: &Link,
    taxonomy: &TaxonomyConfig,
    slug: &str,
) -> Result<DataKind, CoreError> {
    fetch_metadata(source, TAXONOMY_TYPE, "taxonomies", &taxonomy.taxonomy).await;

    let route = TermRoute {
        terms_endpoint: &taxonomy.endpoint,
        filter_param: &taxonomy.endpoint,
        list_endpoint: &taxonomy.post_type_endpoint,
        entity_type: &taxonomy.taxonomy,
    };
    let name = taxonomy.taxonomy.clone();
    term_archive(source, link, &route, slug, |id| ArchiveKind::Taxonomy {
        taxonomy: name,
        id,
    })
    .await
}

/// Custom post type archive, when the link is one.
async fn post_type_archive(
    source: &Source,
    link: &Link,
) -> Option<Result<DataKind, CoreError>> {
    let post_type = source.config().post_types.iter().find(|pt| {
        pt.archive
            .as_deref()
            .and_then(|a| Link::parse(a).ok())
            .is_some_and(|a| a.path == link.path)
    })?;

    fetch_metadata(source, POST_TYPE_TYPE, "types", &post_type.post_type).await;

    Some(
        archive(
            source,
            link,
            &post_type.endpoint,
            ListParams::page(link.page),
            &post_type.post_type,
            ArchiveKind::PostTypeArchive {
                post_type: post_type.post_type.clone(),
            },
        )
        .await,
    )
}

// ── Single entities ──────────────────────────────────────────────────

/// Entity by slug, trying the configured post types in order.
async fn by_slug(source: &Source, link: &Link) -> Result<DataKind, CoreError> {
    let slug = link
        .segments()
        .last()
        .map(|s| (*s).to_owned())
        .ok_or_else(|| not_found(link))?;

    for post_type in source.config().post_type_endpoints() {
        let candidates = match source.client().find_by_slug(&post_type.endpoint, &slug).await {
            Ok(candidates) => candidates,
            // Unregistered custom types answer 404 `rest_no_route`.
            Err(err) if err.is_not_found() => {
                debug!(endpoint = %post_type.endpoint, "endpoint not found, skipping");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(entity) = pick_by_link(source, &candidates, link) {
            let item = source
                .merge_value(entity, &post_type.post_type)
                .ok_or_else(|| not_found(link))?;
            let is_preview = merge_preview(source, link, &post_type.endpoint, &item).await?;
            return Ok(DataKind::PostType(PostTypeData {
                post_type: item.entity_type,
                id: item.id,
                is_preview,
            }));
        }
    }

    Err(not_found(link))
}

/// `?p=ID` (with an optional `post_type`) and `?page_id=ID`. The post
/// type is `None` when `post_type` names an unconfigured type.
fn id_query(source: &Source, link: &Link) -> Option<(Option<PostTypeConfig>, u64)> {
    if !link.is_root() {
        return None;
    }
    let types = source.config().post_type_endpoints();
    let by_type = |name: &str| types.iter().find(|t| t.post_type == name).cloned();

    if let Some(id) = link.query.get("p").and_then(|v| v.parse().ok()) {
        let name = link.query.get("post_type").map_or("post", String::as_str);
        return Some((by_type(name), id));
    }
    if let Some(id) = link.query.get("page_id").and_then(|v| v.parse().ok()) {
        return Some((by_type("page"), id));
    }
    None
}

async fn by_id(
    source: &Source,
    link: &Link,
    post_type: &PostTypeConfig,
    id: u64,
) -> Result<DataKind, CoreError> {
    let value = source.client().get_by_id(&post_type.endpoint, id).await?;
    let item = source
        .merge_value(&value, &post_type.post_type)
        .ok_or_else(|| not_found(link))?;
    let is_preview = merge_preview(source, link, &post_type.endpoint, &item).await?;

    Ok(DataKind::PostType(PostTypeData {
        post_type: item.entity_type,
        id: item.id,
        is_preview,
    }))
}

/// With `preview=true`, merge the latest revision of `item` over it.
/// Returns whether the link is a preview.
async fn merge_preview(
    source: &Source,
    link: &Link,
    endpoint: &str,
    item: &ItemRef,
) -> Result<bool, CoreError> {
    if link.query.get("preview").is_none_or(|v| v != "true") {
        return Ok(false);
    }
    if !source.client().has_auth() {
        warn!(link = %link, "preview requested without a preview token");
    }
    match source.client().latest_revision(endpoint, item.id).await? {
        Some(Value::Object(mut revision)) => {
            for field in REVISION_SKIP {
                revision.remove(field);
            }
            source.merge_fields(&item.entity_type, item.id, revision);
        }
        Some(_) | None => debug!(link = %link, "no revision to preview"),
    }
    Ok(true)
}

// ── Helpers ──────────────────────────────────────────────────────────

/// The candidate whose canonical link is the requested route. Candidates
/// without a `link` field are accepted as-is.
fn pick_by_link<'v>(source: &Source, candidates: &'v [Value], link: &Link) -> Option<&'v Value> {
    candidates.iter().find(|candidate| {
        match candidate.get("link").and_then(Value::as_str) {
            Some(candidate_link) => source
                .normalizer()
                .parse(candidate_link)
                .is_ok_and(|l| l.path == link.path),
            None => true,
        }
    })
}

fn custom_taxonomy<'a, 's>(
    source: &'a Source,
    segments: &[&'s str],
) -> Option<(&'a TaxonomyConfig, &'s str)> {
    let (base, rest) = segments.split_first()?;
    let slug = rest.last()?;
    let taxonomy = source
        .config()
        .taxonomies
        .iter()
        .find(|t| t.taxonomy == *base)?;
    Some((taxonomy, slug))
}

fn date_parts(segments: &[&str]) -> Option<(i32, Option<u32>, Option<u32>)> {
    fn number<T: std::str::FromStr>(s: &str, max_len: usize) -> Option<T> {
        if s.is_empty() || s.len() > max_len || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    }

    match *segments {
        [y] if y.len() == 4 => Some((number(y, 4)?, None, None)),
        [y, m] if y.len() == 4 => Some((number(y, 4)?, Some(number(m, 2)?), None)),
        [y, m, d] if y.len() == 4 => Some((
            number(y, 4)?,
            Some(number(m, 2)?),
            Some(number(d, 2)?),
        )),
        _ => None,
    }
}

/// `(after, before)` bounds of a date archive. WordPress treats both as
/// exclusive.
fn date_range(year: i32, month: Option<u32>, day: Option<u32>) -> Option<(String, String)> {
    let start = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))?;
    let end = match (month, day) {
        (None, _) | (Some(12), None) => NaiveDate::from_ymd_opt(year + 1, 1, 1)?,
        (Some(m), None) => NaiveDate::from_ymd_opt(year, m + 1, 1)?,
        (Some(_), Some(_)) => start.succ_opt()?,
    };

    let after: NaiveDateTime = start
        .and_hms_opt(0, 0, 0)?
        .checked_sub_signed(TimeDelta::seconds(1))?;
    let before: NaiveDateTime = end.and_hms_opt(0, 0, 0)?;
    Some((
        after.format(DATE_FORMAT).to_string(),
        before.format(DATE_FORMAT).to_string(),
    ))
}

/// Best-effort fetch of post-type or taxonomy metadata.
async fn fetch_metadata(source: &Source, kind: &str, endpoint: &str, slug: &str) {
    let already = match kind {
        POST_TYPE_TYPE => source.store().entities().post_type(slug).is_some(),
        _ => source.store().entities().taxonomy(slug).is_some(),
    };
    if already {
        return;
    }
    match source
        .client()
        .get::<Value>(&format!("{endpoint}/{slug}"), &[])
        .await
    {
        Ok(resp) => source.set_metadata(kind, slug, resp.data),
        Err(err) => warn!(kind, slug, error = %err, "cannot fetch metadata"),
    }
}

fn not_found(link: &Link) -> CoreError {
    CoreError::NotFound { link: link.key() }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn date_segments() {
        assert_eq!(date_parts(&["2016"]), Some((2016, None, None)));
        assert_eq!(date_parts(&["2016", "03"]), Some((2016, Some(3), None)));
        assert_eq!(
            date_parts(&["2016", "03", "21"]),
            Some((2016, Some(3), Some(21)))
        );
        assert_eq!(date_parts(&["2016", "hello-world"]), None);
        assert_eq!(date_parts(&["hello"]), None);
        assert_eq!(date_parts(&["201"]), None);
        assert_eq!(date_parts(&["2016", "03", "21", "x"]), None);
    }

    #[test]
    fn date_ranges() {
        assert_eq!(
            date_range(2016, None, None).unwrap(),
            ("2015-12-31T23:59:59".to_owned(), "2017-01-01T00:00:00".to_owned())
        );
        assert_eq!(
            date_range(2016, Some(2), None).unwrap(),
            ("2016-01-31T23:59:59".to_owned(), "2016-03-01T00:00:00".to_owned())
        );
        assert_eq!(
            date_range(2016, Some(12), None).unwrap().1,
            "2017-01-01T00:00:00"
        );
        assert_eq!(
            date_range(2016, Some(2), Some(29)).unwrap().1,
            "2016-03-01T00:00:00"
        );
        assert!(date_range(2016, Some(13), None).is_none());
        assert!(date_range(2015, Some(2), Some(29)).is_none());
    }

    #[test]
    fn id_queries_only_on_root() {
        let link = Link::parse("/?p=60&preview=true").unwrap();
        assert_eq!(id_query(&link), Some(("posts", "post", 60)));
        let link = Link::parse("/?page_id=7").unwrap();
        assert_eq!(id_query(&link), Some(("pages", "page", 7)));
        let link = Link::parse("/some-post/?p=60").unwrap();
        assert_eq!(id_query(&link), None);
        let link = Link::parse("/?p=abc").unwrap();
        assert_eq!(id_query(&link), None);
    }
}
