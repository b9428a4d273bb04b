//! Process-wide default request configuration.
//!
//! The default layer lives behind an `ArcSwap`. Dispatchers load a snapshot
//! each time they prepare a request, so replacing the default only affects
//! requests prepared afterwards; requests already in flight keep the snapshot
//! they started with.
//!
//! There is a single writer by convention: the application (or the config
//! watcher) calls [`set_default_request_config`]. Readers never block.

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::config::schema::RequestConfig;

/// Shared handle to a default layer.
pub type DefaultContext = Arc<ArcSwap<RequestConfig>>;

static GLOBAL: Lazy<DefaultContext> =
    Lazy::new(|| Arc::new(ArcSwap::from_pointee(RequestConfig::default())));

/// The process-wide context used by dispatchers unless they are given their own.
pub fn global_context() -> DefaultContext {
    GLOBAL.clone()
}

/// Create an isolated context, e.g. for one embedded client or a test.
pub fn new_context(initial: RequestConfig) -> DefaultContext {
    Arc::new(ArcSwap::from_pointee(initial))
}

/// Replace the process-wide default.
pub fn set_default_request_config(config: RequestConfig) {
    tracing::debug!(
        base_url = ?config.base_url,
        headers = config.headers.len(),
        "Process-wide request defaults replaced"
    );
    GLOBAL.store(Arc::new(config));
}

/// Current process-wide default snapshot.
pub fn default_request_config() -> Arc<RequestConfig> {
    GLOBAL.load_full()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_unaffected_by_later_store() {
        let ctx = new_context(RequestConfig::new().with_header("x-v", "1"));
        let snapshot = ctx.load_full();
        ctx.store(Arc::new(RequestConfig::new().with_header("x-v", "2")));

        assert_eq!(snapshot.headers["x-v"], "1");
        assert_eq!(ctx.load().headers["x-v"], "2");
    }
}
