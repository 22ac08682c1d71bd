#![allow(clippy::unwrap_used)]
// Integration tests for `Source` against a mocked WordPress REST API.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use frontity_core::{
    ArchiveKind, FetchOptions, PostTypeConfig, RedirectRule, RedirectionMode, Source, SourceConfig,
    Store, TaxonomyConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer) -> SourceConfig {
    SourceConfig::new(Url::parse(&server.uri()).unwrap())
}

fn source(server: &MockServer) -> Source {
    Source::new(config(server)).unwrap()
}

fn post(server: &MockServer, id: u64, slug: &str) -> Value {
    json!({
        "id": id,
        "type": "post",
        "slug": slug,
        "link": format!("{}/{slug}/", server.uri()),
        "title": { "rendered": slug },
        "_embedded": {
            "author": [{
                "id": 1,
                "slug": "admin",
                "name": "Admin",
                "link": format!("{}/author/admin/", server.uri()),
            }]
        }
    })
}

async fn mount_post(server: &MockServer, id: u64, slug: &str) {
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", slug))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post(server, id, slug)])))
        .mount(server)
        .await;
}

// ── Single entities ─────────────────────────────────────────────────

#[tokio::test]
async fn test_post_by_slug() {
    let server = MockServer::start().await;
    mount_post(&server, 60, "hello-world").await;
    let source = source(&server);

    source.fetch("/hello-world/").await;

    let data = source.get("/hello-world/");
    assert!(data.is_ready);
    assert!(!data.is_fetching);
    assert!(data.is_post_type());
    let post = data.as_post_type().unwrap();
    assert_eq!((post.post_type.as_str(), post.id), ("post", 60));

    let entity = source.entity("post", 60).unwrap();
    assert_eq!(entity.link.as_deref(), Some("/hello-world/"));
    assert_eq!(entity.rendered("title"), Some("hello-world"));
    assert!(source.entity("author", 1).is_some());
    assert!(source.store().last_fetch().is_some());
}

#[tokio::test]
async fn test_spellings_share_one_descriptor() {
    let server = MockServer::start().await;
    mount_post(&server, 60, "hello-world").await;
    let source = source(&server);

    source
        .fetch(&format!("{}/hello-world", server.uri()))
        .await;

    let a = source.get("/hello-world/");
    let b = source.get("/hello-world");
    let c = source.get(&format!("{}/hello-world/#comments", server.uri()));
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &c));
}

#[tokio::test]
async fn test_falls_back_to_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/pages"))
        .and(query_param("slug", "about"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 2,
            "type": "page",
            "slug": "about",
            "link": format!("{}/about/", server.uri()),
        }])))
        .mount(&server)
        .await;
    let source = source(&server);

    source.fetch("/about/").await;

    let data = source.get("/about/");
    assert_eq!(data.as_post_type().unwrap().post_type, "page");
    assert!(source.entity("page", 2).is_some());
}

#[tokio::test]
async fn test_candidate_with_other_link_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 9,
            "type": "post",
            "slug": "hello",
            "link": format!("{}/2019/hello/", server.uri()),
        }])))
        .mount(&server)
        .await;
    let source = source(&server);

    source.fetch("/other/hello/").await;

    assert!(source.get("/other/hello/").is_404());
}

// ── Deduplication ───────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_fetches_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "hello-world"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([post(&server, 60, "hello-world")]))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let source = source(&server);

    let absolute = format!("{}/hello-world", server.uri());
    tokio::join!(
        source.fetch("/hello-world/"),
        source.fetch("/hello-world"),
        source.fetch(&absolute),
    );

    assert!(source.get("/hello-world/").is_ready);
    // Ready descriptors are not fetched again.
    source.fetch("/hello-world/").await;
}

#[tokio::test]
async fn test_force_refetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "hello-world"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post(&server, 60, "hello-world")])))
        .expect(2)
        .mount(&server)
        .await;
    let source = source(&server);

    source.fetch("/hello-world/").await;
    source
        .fetch_with("/hello-world/", FetchOptions { force: true })
        .await;

    assert!(source.get("/hello-world/").is_ready);
}

// ── Archives ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_home_archive_with_totals() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-WP-Total", "13")
                .insert_header("X-WP-TotalPages", "2")
                .set_body_json(json!([post(&server, 57, "shinjuku"), post(&server, 55, "osaka")])),
        )
        .mount(&server)
        .await;
    let source = source(&server);

    source.fetch("/page/2/").await;

    let data = source.get("/page/2");
    assert!(data.is_home());
    assert_eq!(data.page, 2);
    let archive = data.as_archive().unwrap();
    assert_eq!(archive.total, Some(13));
    assert_eq!(archive.total_pages, Some(2));
    let ids: Vec<u64> = archive.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, [57, 55]);
    assert_eq!(archive.items[0].link, "/shinjuku/");

    let resolved = source.resolve(&data);
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[1].slug(), Some("osaka"));
}

#[tokio::test]
async fn test_search_is_an_archive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("search", "nature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post(&server, 60, "gullfoss")])))
        .mount(&server)
        .await;
    let source = source(&server);

    source.fetch("/?s=nature").await;

    let data = source.get("/?s=nature");
    assert!(data.is_search());
    assert!(data.is_archive());
    assert_eq!(data.as_archive().unwrap().search.as_deref(), Some("nature"));
}

#[tokio::test]
async fn test_category_archive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/categories"))
        .and(query_param("slug", "nature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 7,
            "taxonomy": "category",
            "slug": "nature",
            "link": format!("{}/category/nature/", server.uri()),
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("categories", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post(&server, 60, "gullfoss")])))
        .mount(&server)
        .await;
    let source = source(&server);

    source.fetch("/category/nature/").await;

    let data = source.get("/category/nature/");
    assert_eq!(
        data.as_archive().unwrap().kind,
        ArchiveKind::Category { id: 7 }
    );
    assert_eq!(source.entity("category", 7).unwrap().slug(), Some("nature"));
}

#[tokio::test]
async fn test_tag_and_author_archives() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/tags"))
        .and(query_param("slug", "iceland"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 10,
            "taxonomy": "post_tag",
            "slug": "iceland",
            "link": format!("{}/tag/iceland/", server.uri()),
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/users"))
        .and(query_param("slug", "alan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 4,
            "slug": "alan",
            "link": format!("{}/author/alan/", server.uri()),
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let source = source(&server);

    source.fetch("/tag/iceland/").await;
    source.fetch("/author/alan/").await;

    assert_eq!(
        source.get("/tag/iceland/").as_archive().unwrap().kind,
        ArchiveKind::Tag { id: 10 }
    );
    assert!(source.entity("tag", 10).is_some());
    assert_eq!(
        source.get("/author/alan/").as_archive().unwrap().kind,
        ArchiveKind::Author { id: 4 }
    );
    assert!(source.entity("author", 4).is_some());
}

#[tokio::test]
async fn test_date_archive_sends_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("after", "2016-01-31T23:59:59"))
        .and(query_param("before", "2016-03-01T00:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let source = source(&server);

    source.fetch("/2016/02/").await;

    let data = source.get("/2016/02/");
    assert_eq!(
        data.as_archive().unwrap().kind,
        ArchiveKind::Date {
            year: 2016,
            month: Some(2),
            day: None
        }
    );
}

#[tokio::test]
async fn test_custom_post_type_archive_and_taxonomy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/types/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "slug": "movie", "rest_base": "movies" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/movies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 30,
            "type": "movie",
            "slug": "alien",
            "link": format!("{}/movies/alien/", server.uri()),
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/taxonomies/actor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "slug": "actor" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/actors"))
        .and(query_param("slug", "sigourney"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 3,
            "taxonomy": "actor",
            "slug": "sigourney",
            "link": format!("{}/actor/sigourney/", server.uri()),
        }])))
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.post_types.push(PostTypeConfig {
        post_type: "movie".into(),
        endpoint: "movies".into(),
        archive: Some("/movies".into()),
    });
    config.taxonomies.push(TaxonomyConfig {
        taxonomy: "actor".into(),
        endpoint: "actors".into(),
        post_type_endpoint: "movies".into(),
    });
    let source = Source::new(config).unwrap();

    source.fetch("/movies/").await;
    source.fetch("/actor/sigourney/").await;

    let movies = source.get("/movies/");
    assert_eq!(
        movies.as_archive().unwrap().kind,
        ArchiveKind::PostTypeArchive {
            post_type: "movie".into()
        }
    );
    assert!(source.entity("movie", 30).is_some());
    assert!(source.store().entities().post_type("movie").is_some());

    let actor = source.get("/actor/sigourney/");
    assert_eq!(
        actor.as_archive().unwrap().kind,
        ArchiveKind::Taxonomy {
            taxonomy: "actor".into(),
            id: 3
        }
    );
    assert!(source.store().entities().taxonomy("actor").is_some());
}

// ── Previews ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_preview_merges_latest_revision() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts/60"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(post(&server, 60, "hello-world")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts/60/revisions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 61,
            "parent": 60,
            "title": { "rendered": "Draft title" },
        }])))
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.preview_token = Some(SecretString::from("secret"));
    let source = Source::new(config).unwrap();

    source.fetch("/?p=60&preview=true").await;

    let data = source.get("/?preview=true&p=60");
    let post = data.as_post_type().unwrap();
    assert!(post.is_preview);
    assert_eq!(post.id, 60);

    let entity = source.entity("post", 60).unwrap();
    assert_eq!(entity.id, 60);
    assert_eq!(entity.rendered("title"), Some("Draft title"));
    assert_eq!(entity.link.as_deref(), Some("/hello-world/"));
}

#[tokio::test]
async fn test_preview_of_custom_post_type_draft() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/movies/17"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 17,
            "type": "movie",
            "slug": "alien",
            "link": format!("{}/movies/alien/", server.uri()),
            "title": { "rendered": "Alien" },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/movies/17/revisions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 18,
            "parent": 17,
            "title": { "rendered": "Alien (director's cut)" },
        }])))
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.preview_token = Some(SecretString::from("secret"));
    config.post_types.push(PostTypeConfig {
        post_type: "movie".into(),
        endpoint: "movies".into(),
        archive: None,
    });
    let source = Source::new(config).unwrap();

    source.fetch("/?post_type=movie&p=17&preview=true").await;

    let data = source.get("/?p=17&post_type=movie&preview=true");
    let movie = data.as_post_type().unwrap();
    assert_eq!(movie.post_type, "movie");
    assert_eq!(movie.id, 17);
    assert!(movie.is_preview);
    assert_eq!(
        source.entity("movie", 17).unwrap().rendered("title"),
        Some("Alien (director's cut)")
    );
}

#[tokio::test]
async fn test_unknown_post_type_query_is_404() {
    let server = MockServer::start().await;
    let source = source(&server);

    source.fetch("/?post_type=movie&p=17").await;

    assert_eq!(
        source.get("/?post_type=movie&p=17").as_error().unwrap().error_status,
        404
    );
}

#[tokio::test]
async fn test_preview_of_published_entity_by_slug() {
    let server = MockServer::start().await;
    mount_post(&server, 60, "hello-world").await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts/60/revisions"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 62,
            "parent": 60,
            "title": { "rendered": "Hello (edited)" },
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.preview_token = Some(SecretString::from("secret"));
    let source = Source::new(config).unwrap();

    source.fetch("/hello-world/?preview_id=62&preview=true").await;

    let data = source.get("/hello-world/?preview=true&preview_id=62");
    let post = data.as_post_type().unwrap();
    assert_eq!(post.id, 60);
    assert!(post.is_preview);

    let entity = source.entity("post", 60).unwrap();
    assert_eq!(entity.rendered("title"), Some("Hello (edited)"));
    assert_eq!(entity.link.as_deref(), Some("/hello-world/"));
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_unknown_link_leaves_store_untouched() {
    let server = MockServer::start().await;
    let source = source(&server);
    let version = source.store().version();
    let before = *version.borrow();

    let data = source.get("/never-fetched?b=2&a=1");

    assert_eq!(data.link, "/never-fetched/?a=1&b=2");
    assert!(!data.is_ready);
    assert!(!data.is_fetching);
    assert_eq!(data.query.get("a").map(String::as_str), Some("1"));
    assert!(source.store().data().is_empty());
    assert_eq!(*version.borrow(), before);
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_unknown_slug_is_404() {
    let server = MockServer::start().await;
    let source = source(&server);

    source.fetch("/missing/").await;

    let data = source.get("/missing/");
    assert!(data.is_ready);
    assert!(data.is_404());
    assert_eq!(data.as_error().unwrap().error_status_text, "Not Found");
}

#[tokio::test]
async fn test_server_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let source = source(&server);

    source.fetch("/hello-world/").await;

    let error = source.get("/hello-world/");
    assert_eq!(error.as_error().unwrap().error_status, 503);
}

#[tokio::test]
async fn test_unreachable_api_is_500() {
    let mut config = SourceConfig::new(Url::parse("http://127.0.0.1:1/").unwrap());
    config.timeout = std::time::Duration::from_secs(2);
    let source = Source::new(config).unwrap();

    source.fetch("/hello-world/").await;

    assert_eq!(
        source.get("/hello-world/").as_error().unwrap().error_status,
        500
    );
}

#[tokio::test]
async fn test_malformed_link_is_404() {
    let server = MockServer::start().await;
    let source = source(&server);

    source.fetch("http://[").await;

    assert!(source.get("http://[").is_404());
}

// ── Redirections ────────────────────────────────────────────────────

#[tokio::test]
async fn test_head_probe_before_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/old-post/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new-post/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.redirections = RedirectionMode::All;
    let source = Source::new(config).unwrap();

    source.fetch("/old-post/").await;

    let data = source.get("/old-post/");
    assert!(!data.is_ready);
    let redirection = data.as_redirection().unwrap();
    assert_eq!(redirection.location, "/new-post/");
    assert_eq!(redirection.redirect_status, Some(301));
    assert!(!redirection.is_external);
}

#[tokio::test]
async fn test_head_probe_after_404() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/old-post/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "https://elsewhere.test/post/"),
        )
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.redirections = RedirectionMode::NotFound;
    let source = Source::new(config).unwrap();

    source.fetch("/old-post/").await;

    let redirection = source.get("/old-post/").as_redirection().cloned().unwrap();
    assert_eq!(redirection.location, "https://elsewhere.test/post/");
    assert_eq!(redirection.redirect_status, Some(302));
    assert!(redirection.is_external);
}

#[tokio::test]
async fn test_rest_redirect_becomes_redirection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", format!("{}/moved/", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    let source = source(&server);

    source.fetch("/hello-world/").await;

    let data = source.get("/hello-world/");
    assert_eq!(data.as_redirection().unwrap().location, "/moved/");
}

#[tokio::test]
async fn test_static_rules_with_pattern_mode() {
    let server = MockServer::start().await;
    let mut config = config(&server);
    config.redirections = "RegExp:^/old/".parse().unwrap();
    config.redirect_rules = vec![RedirectRule {
        source: "^/old/(.*)$".into(),
        target: "/new/$1".into(),
        status: 308,
        regex: true,
        pass_params: true,
    }];
    let source = Source::new(config).unwrap();

    source.fetch("/old/post/?utm=x").await;

    let redirection = source
        .get("/old/post/?utm=x")
        .as_redirection()
        .cloned()
        .unwrap();
    assert_eq!(redirection.location, "/new/post/?utm=x");
    assert_eq!(redirection.redirect_status, Some(308));
}

// ── Hydration ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_hydrated_store_skips_network() {
    let server = MockServer::start().await;
    mount_post(&server, 60, "hello-world").await;
    let first = source(&server);
    first.fetch("/hello-world/").await;
    let snapshot = first.store().snapshot();

    let offline = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&offline)
        .await;
    let mut config = config(&server);
    config.api = Some(Url::parse(&format!("{}/wp-json/", offline.uri())).unwrap());
    let client = frontity_api::WpClient::new(
        config.api_url().unwrap(),
        false,
        &frontity_api::TransportConfig::default(),
    )
    .unwrap();
    let hydrated = Source::from_parts(
        config,
        client,
        Arc::new(frontity_core::source::NoRules),
        Store::from_snapshot(snapshot),
    );

    hydrated.fetch("/hello-world/").await;

    assert!(hydrated.get("/hello-world/").is_ready);
    assert!(hydrated.entity("post", 60).is_some());
}
