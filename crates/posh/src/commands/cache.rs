//! Cache command - inspect and manage the prompt cache.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use posh_cache::{CacheDuration, CacheManager, ClearResult, Scope, Value};
use serde::Serialize;
use tracing::warn;

use super::Context;

/// Arguments for the cache command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show the resolved cache directory
    Path,

    /// Show the resolved session identifier
    SessionId,

    /// List cached entries
    Show {
        /// Only this scope: session or device
        #[arg(long)]
        scope: Option<Scope>,
    },

    /// Print a cached value (exit code 1 when missing)
    Get {
        key: String,

        /// Scope to read from: session or device
        #[arg(long, default_value = "device")]
        scope: Scope,
    },

    /// Store a text value
    Set {
        key: String,

        value: String,

        /// Time to live, e.g. 30s, 5m, 24h, infinite, none
        #[arg(long, default_value = "24h")]
        ttl: String,

        /// Scope to write to: session or device
        #[arg(long, default_value = "device")]
        scope: Scope,
    },

    /// Remove one entry
    Delete {
        key: String,

        /// Scope to delete from: session or device
        #[arg(long, default_value = "device")]
        scope: Scope,
    },

    /// Remove every entry of a scope
    DeleteAll {
        /// Scope to empty: session or device
        #[arg(long, default_value = "device")]
        scope: Scope,
    },

    /// Remove cache files unused for a week
    Clear {
        /// Remove every cache file regardless of age
        #[arg(short, long)]
        force: bool,
    },
}

/// One entry for JSON output.
#[derive(Debug, Serialize)]
struct EntryOutput {
    scope: Scope,
    key: String,
    value: String,
    #[serde(rename = "type")]
    kind: &'static str,
    ttl: i64,
    expires_at: Option<i64>,
    expired: bool,
}

/// Run the cache command.
pub fn run(args: CacheArgs, ctx: &Context) -> Result<ExitCode> {
    let manager = CacheManager::new(ctx.config.clone());

    let code = match args.command {
        CacheCommand::Path => cmd_path(&manager, ctx)?,
        CacheCommand::SessionId => cmd_session_id(&manager, ctx)?,
        CacheCommand::Show { scope } => cmd_show(&manager, scope, ctx)?,
        CacheCommand::Get { key, scope } => cmd_get(&manager, scope, &key, ctx)?,
        CacheCommand::Set {
            key,
            value,
            ttl,
            scope,
        } => cmd_set(&manager, scope, key, value, ttl, ctx),
        CacheCommand::Delete { key, scope } => {
            manager.delete(scope, &key);
            ExitCode::SUCCESS
        }
        CacheCommand::DeleteAll { scope } => {
            manager.delete_all(scope);
            ExitCode::SUCCESS
        }
        CacheCommand::Clear { force } => cmd_clear(&manager, force, ctx)?,
    };

    // Close failures are logged, never fatal
    if let Err(e) = manager.close() {
        warn!(error = %e, "Cache changes were not saved");
    }
    Ok(code)
}

fn cmd_path(manager: &CacheManager, ctx: &Context) -> Result<ExitCode> {
    if ctx.json_output {
        let output = serde_json::json!({ "cache_dir": manager.cache_dir() });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", manager.cache_dir().display());
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_session_id(manager: &CacheManager, ctx: &Context) -> Result<ExitCode> {
    if ctx.json_output {
        let output = serde_json::json!({ "session_id": manager.session_id() });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", manager.session_id());
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_show(manager: &CacheManager, scope: Option<Scope>, ctx: &Context) -> Result<ExitCode> {
    let scopes: Vec<Scope> = match scope {
        Some(scope) => vec![scope],
        None => Scope::ALL.to_vec(),
    };

    if ctx.json_output {
        let now = manager.config().clock.now();
        let mut output = Vec::new();
        for scope in scopes {
            for (key, entry) in manager.store(scope).entries() {
                output.push(EntryOutput {
                    scope,
                    key,
                    value: entry.value.to_string(),
                    kind: entry.value.type_name(),
                    ttl: entry.ttl,
                    expires_at: entry.expires_at(),
                    expired: entry.expired_at(now),
                });
            }
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(ExitCode::SUCCESS);
    }

    let dim = Style::new().dim();
    for scope in scopes {
        let store = manager.store(scope);
        println!();
        println!("{}", style(format!("{} cache", scope)).bold());
        if ctx.verbose {
            println!("  {} {}", dim.apply_to("File:"), store.path().display());
        }
        println!("{}", dim.apply_to("─".repeat(40)));
        print!("{}", store.describe());
    }
    println!();
    Ok(ExitCode::SUCCESS)
}

fn cmd_get(manager: &CacheManager, scope: Scope, key: &str, ctx: &Context) -> Result<ExitCode> {
    let Some(value) = manager.get::<Value>(scope, key) else {
        if ctx.verbose {
            eprintln!("{}", Style::new().yellow().apply_to(format!("{key}: not cached")));
        }
        return Ok(ExitCode::FAILURE);
    };

    if ctx.json_output {
        let output = serde_json::json!({
            "scope": scope,
            "key": key,
            "value": value.to_string(),
            "type": value.type_name(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match value {
            Value::Text(text) => println!("{text}"),
            other => println!("{other}"),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_set(
    manager: &CacheManager,
    scope: Scope,
    key: String,
    value: String,
    ttl: String,
    ctx: &Context,
) -> ExitCode {
    let duration = CacheDuration::from(ttl);
    if duration.seconds() == 0 && ctx.verbose {
        eprintln!(
            "{}",
            Style::new()
                .yellow()
                .apply_to(format!("TTL '{duration}' disables caching, nothing stored"))
        );
    }
    manager.set(scope, key, value, &duration);
    ExitCode::SUCCESS
}

fn cmd_clear(manager: &CacheManager, force: bool, ctx: &Context) -> Result<ExitCode> {
    let result: ClearResult = posh_cache::clear(manager.cache_dir(), force)?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(ExitCode::SUCCESS);
    }

    let dim = Style::new().dim();
    for path in &result.removed {
        println!("removed {}", path.display());
    }
    println!(
        "{}",
        dim.apply_to(format!(
            "{} of {} cache files removed",
            result.removed.len(),
            result.files_checked
        ))
    );
    Ok(ExitCode::SUCCESS)
}
