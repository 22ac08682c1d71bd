//! Config subcommand handlers.

use dialoguer::{Input, Select};

use frontity_config::{self as config, Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{active_profile_name, find_profile};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// A copy of `cfg` with plaintext secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.preview_token.is_some() {
            profile.preview_token = Some(REDACTED.into());
        }
    }
    cfg
}

fn format_config_toml(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# failed to render config: {e}"))
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Prompt(e.to_string())
}

/// Store the token in the keyring, or hand it back for the config file.
fn prompt_token_storage(profile_name: &str, token: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the preview token?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        config::store_preview_token(profile_name, token)?;
        eprintln!("   ✓ preview token stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(token.to_owned()))
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(&global.output, &cfg, format_config_toml, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: frontity config init");
                return Ok(());
            }
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort();
            let lines: Vec<String> = names
                .into_iter()
                .map(|name| {
                    let marker = if name == default { " *" } else { "" };
                    format!("{name}{marker}")
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            find_profile(&cfg, &name)?;
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetToken { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| active_profile_name(global, &cfg));
            find_profile(&cfg, &profile_name)?;

            let token = rpassword::prompt_password("Preview token: ").map_err(prompt_err)?;
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "preview_token".into(),
                    reason: "token cannot be empty".into(),
                });
            }
            config::store_preview_token(&profile_name, &token)?;
            eprintln!("✓ Preview token stored for profile '{profile_name}'");
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("✨ frontity configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let frontity_url: String = Input::new()
        .with_prompt("Frontity site URL")
        .default("https://example.com".into())
        .interact_text()
        .map_err(prompt_err)?;

    let wp_url: String = Input::new()
        .with_prompt("WordPress URL (empty if same as site)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let modes = &["no", "404", "all"];
    let mode = Select::new()
        .with_prompt("Check redirections")
        .items(modes)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let token =
        rpassword::prompt_password("Preview token (empty to skip): ").map_err(prompt_err)?;
    let preview_token = match optional(&token) {
        Some(token) => prompt_token_storage(&profile_name, &token)?,
        None => None,
    };

    let profile = Profile {
        frontity_url,
        url: optional(&wp_url),
        redirections: modes.get(mode).map(|m| (*m).to_owned()),
        preview_token,
        ..Profile::default()
    };

    // Validate before writing anything.
    config::profile_to_source_config(&profile, &profile_name, &config::Defaults::default())?;

    let mut cfg = config::load_config_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    let path = config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: frontity api && frontity get /");
    Ok(())
}
