//! GramControl CLI
//!
//! Developer tool for inspecting the settings the extension stores and the
//! navigation guard it applies.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use gc_core::config::SETTINGS_KEY;
use gc_core::host::Location;
use gc_core::navigation::needs_following_redirect;
use gc_core::{Flag, Settings, SettingsChange};

#[cfg(feature = "e2e")]
mod e2e;

#[derive(Parser)]
#[command(name = "gc-cli")]
#[command(about = "GramControl settings and navigation tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stored settings record
    Defaults {
        /// Print the record written on install instead of the model default
        #[arg(long)]
        install: bool,
    },

    /// List the flags with their popup labels
    Flags,

    /// Show whether the home-feed guard would redirect a URL
    CheckUrl {
        /// Absolute URL, e.g. https://www.instagram.com/
        url: String,
    },

    /// Decode a storage.onChanged payload as the content script would
    ParseChange {
        /// The `changes` object as JSON
        changes: String,

        /// Storage area the change came from
        #[arg(long, default_value = "local")]
        area: String,
    },

    /// Smoke-test a built extension in Chrome
    #[cfg(feature = "e2e")]
    E2e {
        /// chromedriver URL
        #[arg(long, default_value = "http://localhost:9515")]
        chromedriver: String,

        /// Unpacked extension directory
        #[arg(long)]
        extension: String,

        /// Run Chrome headless
        #[arg(long)]
        headless: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Defaults { install } => cmd_defaults(install),
        Commands::Flags => cmd_flags(),
        Commands::CheckUrl { url } => cmd_check_url(&url),
        Commands::ParseChange { changes, area } => cmd_parse_change(&changes, &area),
        #[cfg(feature = "e2e")]
        Commands::E2e {
            chromedriver,
            extension,
            headless,
        } => e2e::run_e2e(e2e::E2eOptions {
            chromedriver_url: chromedriver,
            extension_path: extension,
            headless,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// `{ "settings": { ... } }`, exactly as written to `storage.local`.
fn stored_record(settings: &Settings) -> Result<Value, String> {
    let value = serde_json::to_value(settings).map_err(|e| format!("Failed to serialize settings: {e}"))?;
    Ok(json!({ SETTINGS_KEY: value }))
}

fn cmd_defaults(install: bool) -> Result<(), String> {
    let settings = if install {
        Settings::install_defaults()
    } else {
        Settings::default()
    };
    let record = stored_record(&settings)?;
    let text = serde_json::to_string_pretty(&record).map_err(|e| format!("Failed to format record: {e}"))?;
    println!("{text}");
    Ok(())
}

fn cmd_flags() -> Result<(), String> {
    let defaults = Settings::default();
    let install = Settings::install_defaults();

    println!("{:<26} {:<8} {:<8} Label", "Key", "Default", "Install");
    for flag in Flag::ALL {
        println!(
            "{:<26} {:<8} {:<8} {}",
            flag.key(),
            defaults.get(flag),
            install.get(flag),
            flag.label()
        );
        println!("{:<44} {}", "", flag.description());
    }
    Ok(())
}

fn cmd_check_url(url: &str) -> Result<(), String> {
    if gc_core::url::get_scheme_end(url).is_none() {
        return Err(format!("Not an absolute URL: '{url}'"));
    }

    let location = Location::from_href(url);
    println!("URL:       {url}");
    println!("  Path:    {}", location.pathname);
    println!("  Query:   {}", if location.search.is_empty() { "(none)" } else { location.search.as_str() });
    if needs_following_redirect(&location) {
        println!("  Guard:   redirect to {}", gc_core::config::FOLLOWING_URL);
    } else {
        println!("  Guard:   leave as is");
    }
    Ok(())
}

fn cmd_parse_change(changes: &str, area: &str) -> Result<(), String> {
    let changes: Value = serde_json::from_str(changes).map_err(|e| format!("Invalid JSON: {e}"))?;

    match SettingsChange::parse(area, &changes) {
        Some(settings) => {
            for flag in Flag::ALL {
                println!("{:<26} {}", flag.key(), settings.get(flag));
            }
            Ok(())
        }
        None => Err("Not a settings change for this area".to_string()),
    }
}
