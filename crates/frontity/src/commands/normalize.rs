//! `frontity normalize`: canonical cache keys, no network.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::{GlobalOpts, NormalizeArgs};
use crate::commands::util;
use crate::config::Site;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Normalized {
    input: String,
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Tabled)]
struct NormalizedRow {
    #[tabled(rename = "Input")]
    input: String,
    #[tabled(rename = "Key")]
    key: String,
}

pub fn handle(site: &Site, args: &NormalizeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let links = util::normalizer(&site.source);

    let results: Vec<Normalized> = args
        .links
        .iter()
        .map(|input| match links.normalize(input) {
            Ok(key) => Normalized {
                input: input.clone(),
                key: Some(key),
                error: None,
            },
            Err(e) => Normalized {
                input: input.clone(),
                key: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &results,
        |n| NormalizedRow {
            input: n.input.clone(),
            key: n
                .key
                .clone()
                .or_else(|| n.error.clone())
                .unwrap_or_default(),
        },
        |n| n.key.clone().unwrap_or_default(),
    );
    output::print_output(&out, global.quiet);

    match results.into_iter().find(|n| n.key.is_none()) {
        Some(bad) => Err(CliError::Validation {
            field: format!("link '{}'", bad.input),
            reason: bad.error.unwrap_or_default(),
        }),
        None => Ok(()),
    }
}
