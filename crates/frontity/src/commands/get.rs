//! `frontity get`: fetch one link and show its descriptor.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use frontity_core::{Data, DataKind, Entity, FetchOptions, Source};

use crate::cli::{GetArgs, GlobalOpts};
use crate::commands::util;
use crate::config::Site;
use crate::error::CliError;
use crate::output;

/// What `get` prints: the descriptor plus optional resolved entities.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkReport {
    #[serde(flatten)]
    data: Data,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    entities: Vec<Entity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_fetch: Option<DateTime<Utc>>,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "Type")]
    entity_type: String,
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Link")]
    link: String,
    #[tabled(rename = "Title")]
    title: String,
}

pub async fn handle(site: Site, args: GetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let source = util::build_source(site.source)?;

    let spinner = util::spinner(global, &format!("Fetching {}", args.link));
    source
        .fetch_with(&args.link, FetchOptions { force: args.force })
        .await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let data = source.get(&args.link);
    let entities = if args.entities {
        source
            .resolve(&data)
            .into_iter()
            .map(|e| (*e).clone())
            .collect()
    } else {
        Vec::new()
    };
    let report = LinkReport {
        data: (*data).clone(),
        entities,
        last_fetch: source.store().last_fetch(),
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| detail(&source, r, color),
        |r| r.data.link.clone(),
    );
    output::print_output(&out, global.quiet);

    util::ensure_ok(&data)
}

fn detail(source: &Source, report: &LinkReport, color: bool) -> String {
    let data = &report.data;
    let mut lines: Vec<(&str, String)> = vec![
        ("Link", data.link.clone()),
        ("Route", data.route.clone()),
        ("Page", data.page.to_string()),
        ("Kind", util::kind_label(data)),
        ("Status", util::status_label(data)),
    ];
    if !data.query.is_empty() {
        let query = data
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        lines.push(("Query", query));
    }

    match data.kind {
        DataKind::Error(ref err) => {
            lines.push((
                "Error",
                format!(
                    "{} {}",
                    output::paint_status(err.error_status, color),
                    err.error_status_text
                ),
            ));
        }
        DataKind::Redirection(ref r) => {
            lines.push(("Location", r.location.clone()));
            if let Some(status) = r.redirect_status {
                lines.push(("Redirect", output::paint_status(status, color)));
            }
            lines.push(("External", r.is_external.to_string()));
        }
        DataKind::PostType(ref post) => {
            lines.push(("ID", post.id.to_string()));
            if let Some(entity) = source.entity(&post.post_type, post.id) {
                lines.push(("Title", util::entity_title(&entity)));
            }
            if post.is_preview {
                lines.push(("Preview", "yes".into()));
            }
        }
        DataKind::Archive(ref archive) => {
            if let Some(ref search) = archive.search {
                lines.push(("Search", search.clone()));
            }
            if let Some(total) = archive.total {
                lines.push(("Total", total.to_string()));
            }
            if let Some(pages) = archive.total_pages {
                lines.push(("Pages", pages.to_string()));
            }
        }
        DataKind::Status => {}
    }

    if let Some(at) = report.last_fetch {
        lines.push((
            "Fetched",
            at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ));
    }

    let mut out = output::detail_lines(&lines, color);

    if let Some(archive) = data.as_archive() {
        if !archive.items.is_empty() {
            let rows: Vec<ItemRow> = archive
                .items
                .iter()
                .map(|item| ItemRow {
                    entity_type: item.entity_type.clone(),
                    id: item.id,
                    link: item.link.clone(),
                    title: source
                        .entity(&item.entity_type, item.id)
                        .map(|e| util::entity_title(&e))
                        .unwrap_or_default(),
                })
                .collect();
            out.push_str("\n\n");
            out.push_str(&output::render_table(&rows));
        }
    }

    if !report.entities.is_empty() {
        let rows: Vec<ItemRow> = report
            .entities
            .iter()
            .map(|e| ItemRow {
                entity_type: e.entity_type.clone(),
                id: e.id,
                link: e.link.clone().unwrap_or_default(),
                title: util::entity_title(e),
            })
            .collect();
        out.push_str("\n\n");
        out.push_str(&output::render_table(&rows));
    }

    out
}
