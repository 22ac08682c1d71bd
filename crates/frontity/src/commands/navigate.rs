//! `frontity navigate`: drive a client-side router through a list of links.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

use frontity_core::{MemoryHistory, Platform, Router, RouterState, SetOptions};

use crate::cli::{GlobalOpts, NavigateArgs};
use crate::commands::util;
use crate::config::Site;
use crate::error::CliError;
use crate::output;

/// One navigation and where the router ended up.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Step {
    requested: String,
    link: String,
    status: RouterState,
    kind: String,
    history: usize,
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "Requested")]
    requested: String,
    #[tabled(rename = "Link")]
    link: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Kind")]
    kind: String,
}

pub async fn handle(site: Site, args: NavigateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = site.router_config(Platform::Client, "/", !args.no_fetch);
    let source = util::build_source(site.source)?;
    let history = Arc::new(MemoryHistory::new());
    let router = Router::with_history(config, Some(source), history.clone());
    router.init();

    let result = run_steps(&router, &history, &args, global).await;
    router.shutdown();
    let steps = result?;

    let out = output::render_list(
        &global.output,
        &steps,
        |s| StepRow {
            requested: s.requested.clone(),
            link: s.link.clone(),
            status: s.status.to_string(),
            kind: s.kind.clone(),
        },
        |s| s.link.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn run_steps(
    router: &Router,
    history: &MemoryHistory,
    args: &NavigateArgs,
    global: &GlobalOpts,
) -> Result<Vec<Step>, CliError> {
    let mut steps = Vec::with_capacity(args.links.len());

    for link in &args.links {
        router.set(link, SetOptions::push());
        debug!(link = %link, committed = %router.link(), "navigated");

        if !args.no_fetch {
            let spinner = util::spinner(global, &format!("Loading {link}"));
            let settled =
                tokio::time::timeout(Duration::from_secs(args.wait), router.settled()).await;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            if settled.is_err() {
                return Err(CliError::NotSettled {
                    link: router.link(),
                    seconds: args.wait,
                });
            }
        }

        steps.push(Step {
            requested: link.clone(),
            link: router.link(),
            status: router.status(),
            kind: router
                .data()
                .map_or_else(|| "-".into(), |d| util::kind_label(&d)),
            history: history.len(),
        });
    }

    Ok(steps)
}
