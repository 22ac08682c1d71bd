//! `frontity ssr`: what a server render of a request URL would answer.

use serde::Serialize;

use frontity_core::{Platform, Router, RouterState, SsrResponse};

use crate::cli::{GlobalOpts, SsrArgs};
use crate::commands::util;
use crate::config::Site;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SsrReport {
    link: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    router: RouterState,
    kind: String,
}

pub async fn handle(site: Site, args: SsrArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = site.router_config(Platform::Server, &args.link, true);
    for option in &args.options {
        let (key, value) = parse_option(option)?;
        config.options.insert(key, value);
    }

    let source = util::build_source(site.source)?;
    let router = Router::new(config, Some(source));
    router.init();

    let spinner = util::spinner(global, &format!("Rendering {}", args.link));
    let mut response = SsrResponse::default();
    router.before_ssr(&mut response).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let report = SsrReport {
        link: router.link(),
        status: response.status,
        location: response.location,
        router: router.status(),
        kind: router
            .data()
            .map_or_else(|| "-".into(), |d| util::kind_label(&d)),
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| {
            let mut lines = vec![
                ("Link", r.link.clone()),
                ("Status", output::paint_status(r.status, color)),
            ];
            if let Some(ref location) = r.location {
                lines.push(("Location", location.clone()));
            }
            lines.push(("Kind", r.kind.clone()));
            output::detail_lines(&lines, color)
        },
        |r| match r.location {
            Some(ref location) => format!("{} {location}", r.status),
            None => r.status.to_string(),
        },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

/// `key=value` into a pair; the key must be non-empty.
fn parse_option(raw: &str) -> Result<(String, String), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(CliError::Validation {
            field: "option".into(),
            reason: format!("expected KEY=VALUE, got '{raw}'"),
        }),
    }
}
