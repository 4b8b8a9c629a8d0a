//! CLI command handlers.

pub mod cache;

use posh_cache::CacheConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Cache settings resolved from flags and environment.
    pub config: CacheConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}
