//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use frontity_core::error::LOOP_DETECTED_STATUS;
use frontity_core::{
    ArchiveKind, Data, DataKind, Entity, LinkNormalizer, PostKind, Source, SourceConfig,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Build the source for a resolved site.
pub fn build_source(config: SourceConfig) -> Result<Source, CliError> {
    Ok(Source::new(config)?)
}

/// The normalizer a source built from `config` would use, without
/// building an HTTP client.
pub fn normalizer(config: &SourceConfig) -> LinkNormalizer {
    LinkNormalizer::new(config.source_url())
}

/// A stderr spinner, unless quiet or not attached to a terminal.
pub fn spinner(global: &GlobalOpts, message: &str) -> Option<ProgressBar> {
    if global.quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Turn an error descriptor into the matching CLI error.
pub fn ensure_ok(data: &Data) -> Result<(), CliError> {
    match data.as_error() {
        Some(err) if err.error_status == LOOP_DETECTED_STATUS => Err(CliError::RedirectLoop {
            link: data.link.clone(),
        }),
        Some(err) => Err(CliError::LinkFailed {
            link: data.link.clone(),
            status: err.error_status,
            status_text: err.error_status_text.clone(),
        }),
        None => Ok(()),
    }
}

/// Short label of a descriptor's kind.
pub fn kind_label(data: &Data) -> String {
    match data.kind {
        DataKind::Status if data.is_fetching => "fetching".into(),
        DataKind::Status => "unfetched".into(),
        DataKind::Error(_) => "error".into(),
        DataKind::Redirection(_) => "redirection".into(),
        DataKind::PostType(ref post) => match post.kind() {
            PostKind::Custom => post.post_type.clone(),
            other => other.to_string(),
        },
        DataKind::Archive(ref archive) => {
            let label = archive_label(&archive.kind);
            if archive.search.is_some() {
                format!("search ({label})")
            } else {
                label
            }
        }
    }
}

fn archive_label(kind: &ArchiveKind) -> String {
    match kind {
        ArchiveKind::Taxonomy { taxonomy, id } => format!("{taxonomy} {id}"),
        ArchiveKind::Category { id } => format!("category {id}"),
        ArchiveKind::Tag { id } => format!("tag {id}"),
        ArchiveKind::Author { id } => format!("author {id}"),
        ArchiveKind::PostTypeArchive { post_type } => format!("{post_type} archive"),
        ArchiveKind::PostArchive { is_home: true } => "home".into(),
        ArchiveKind::PostArchive { is_home: false } => "posts archive".into(),
        ArchiveKind::Date { year, month, day } => match (month, day) {
            (Some(m), Some(d)) => format!("date {year}-{m:02}-{d:02}"),
            (Some(m), None) => format!("date {year}-{m:02}"),
            _ => format!("date {year}"),
        },
    }
}

/// One-line status of a descriptor: `ready`, `fetching`, `404 Not Found`...
pub fn status_label(data: &Data) -> String {
    if let Some(err) = data.as_error() {
        return format!("{} {}", err.error_status, err.error_status_text);
    }
    if data.is_fetching {
        "fetching".into()
    } else if data.is_ready {
        "ready".into()
    } else {
        "idle".into()
    }
}

/// Rendered title, or name for users and terms.
pub fn entity_title(entity: &Entity) -> String {
    entity
        .rendered("title")
        .or_else(|| entity.str_field("name"))
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use frontity_core::{ArchiveData, Link, RedirectionData};

    fn data(link: &str) -> Data {
        Data::status(&Link::parse(link).unwrap())
    }

    #[test]
    fn error_descriptors_map_to_cli_errors() {
        let missing = data("/missing/").error(404, "Not Found");
        assert!(matches!(
            ensure_ok(&missing),
            Err(CliError::LinkFailed { status: 404, .. })
        ));

        let looping = data("/x/").error(508, "Loop Detected");
        assert!(matches!(ensure_ok(&looping), Err(CliError::RedirectLoop { .. })));

        let moved = data("/old/").redirection(RedirectionData {
            location: "/new/".into(),
            redirect_status: Some(301),
            is_external: false,
        });
        assert!(ensure_ok(&moved).is_ok());
    }

    #[test]
    fn labels_describe_the_descriptor() {
        let unfetched = data("/a/");
        assert_eq!(kind_label(&unfetched), "unfetched");
        assert_eq!(status_label(&unfetched), "idle");

        let search = data("/?s=hello").settled(DataKind::Archive(ArchiveData {
            kind: ArchiveKind::PostArchive { is_home: true },
            items: Vec::new(),
            total: Some(0),
            total_pages: Some(0),
            search: Some("hello".into()),
        }));
        assert_eq!(kind_label(&search), "search (home)");
        assert_eq!(status_label(&search), "ready");
    }

    #[test]
    fn normalizer_strips_the_site_url() {
        let config = SourceConfig::new("https://site.test/blog".parse().unwrap());
        let links = normalizer(&config);
        assert_eq!(
            links.normalize("https://site.test/blog/hello?b=2&a=1").unwrap(),
            "/hello/?a=1&b=2"
        );
    }
}
