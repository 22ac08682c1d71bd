//! `frontity api`: the URLs a source would talk to.

use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::config::Site;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiInfo {
    profile: String,
    frontity_url: String,
    source_url: String,
    api: String,
    is_wp_com: bool,
    redirections: String,
}

pub fn handle(site: &Site, global: &GlobalOpts) -> Result<(), CliError> {
    let config = &site.source;
    let info = ApiInfo {
        profile: site.profile.clone(),
        frontity_url: config.frontity_url.to_string(),
        source_url: config.source_url().to_string(),
        api: config.api_url()?.to_string(),
        is_wp_com: config.is_wp_com(),
        redirections: config.redirections.to_string(),
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &info,
        |i| {
            output::detail_lines(
                &[
                    ("Profile", i.profile.clone()),
                    ("Frontity URL", i.frontity_url.clone()),
                    ("Source URL", i.source_url.clone()),
                    ("API", i.api.clone()),
                    ("WordPress.com", i.is_wp_com.to_string()),
                    ("Redirections", i.redirections.clone()),
                ],
                color,
            )
        },
        |i| i.api.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
