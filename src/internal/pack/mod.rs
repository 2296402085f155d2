//! Pack generation internals: per-object packing state, representation
//! selection, the windowed delta search and its cache/tasks, the binary
//! output stream, and the orchestrating writer.

pub mod delta_cache;
pub mod delta_task;
pub mod delta_window;
pub mod entry;
pub mod index_entry;
pub mod output;
pub mod pack_index;
pub mod progress;
pub mod registry;
pub mod representation;
pub mod to_pack;
pub mod writer;

#[cfg(test)]
mod tests {
    use tracing_subscriber::util::SubscriberInitExt;

    /// CAUTION: This two is same
    /// 1.
    /// tracing_subscriber::fmt().init();
    ///
    /// 2.
    /// env::set_var("RUST_LOG", "debug"); // must be set if use `fmt::init()`, or no output
    /// tracing_subscriber::fmt::init();
    pub(crate) fn init_logger() {
        let _ = tracing_subscriber::fmt::Subscriber::builder()
            .with_target(false)
            .without_time()
            .with_level(true)
            .with_max_level(tracing::Level::DEBUG)
            .finish()
            .try_init(); // avoid multi-init
    }

    #[test]
    fn logger_can_initialize() {
        init_logger();
        tracing::debug!("pack test logging online");
    }
}
