use env_logger::{Builder, Env};
use log::LevelFilter;

/// Installs the global logger, honouring `RUST_LOG` when it is set.
///
/// `verbose` lowers the default filter from `warn` to `debug`.
pub(crate) fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let env = Env::default().default_filter_or(level.to_string());
    let mut builder = Builder::from_env(env);
    // A logger may already be installed when running under the test harness.
    let _ = builder.try_init();
}
