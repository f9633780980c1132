use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the verbosity count when it is set.
pub fn setup_tracing(verbosity_level: u8, json: bool) {
    let level = match verbosity_level {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let (pretty, json) = if json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer().pretty()), None)
    };

    let subscriber = Registry::default().with(filter).with(pretty).with(json);
    tracing::subscriber::set_global_default(subscriber).expect("unable to set global subscriber");
}
