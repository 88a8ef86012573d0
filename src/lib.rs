pub mod config;
pub mod confirm;
pub mod error;
pub mod memos;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

/// Installs the global logger once. `RUST_LOG` overrides the default filter.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,reqwest=warn,hyper=warn"),
        )
        .format_timestamp(None)
        .init();
    });
}
