//! Command dispatch: bridges CLI args -> source/router -> output formatting.

pub mod api;
pub mod config_cmd;
pub mod get;
pub mod navigate;
pub mod normalize;
pub mod ssr;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Site;
use crate::error::CliError;

/// Dispatch a site-bound command to its handler.
pub async fn dispatch(cmd: Command, site: Site, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Get(args) => get::handle(site, args, global).await,
        Command::Normalize(args) => normalize::handle(&site, &args, global),
        Command::Navigate(args) => navigate::handle(site, args, global).await,
        Command::Ssr(args) => ssr::handle(site, args, global).await,
        Command::Api => api::handle(&site, global),
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}
