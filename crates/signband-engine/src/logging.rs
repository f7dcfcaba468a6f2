//! `env_logger` setup for the host binary. Library code only uses `log` macros.

use std::sync::Once;

/// Filter used when neither an explicit filter nor `RUST_LOG` is given.
///
/// wgpu and naga are chatty at `info`.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` filter syntax, e.g. `"signband_engine=debug"`.
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

/// Installs the global logger. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env = std::env::var("RUST_LOG").ok();
        let filter = resolve_filter(config.env_filter.as_deref(), env.as_deref());

        let installed = env_logger::Builder::new()
            .parse_filters(filter)
            .write_style(config.write_style)
            .try_init();

        // A test harness may already own the logger.
        if installed.is_ok() {
            log::debug!("logging initialized with filter {filter:?}");
        }
    });
}

/// Explicit filter, then `RUST_LOG`, then [`DEFAULT_FILTER`]. Blank values are skipped.
fn resolve_filter<'a>(explicit: Option<&'a str>, env: Option<&'a str>) -> &'a str {
    [explicit, env]
        .into_iter()
        .flatten()
        .find(|f| !f.trim().is_empty())
        .unwrap_or(DEFAULT_FILTER)
}
