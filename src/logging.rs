//! Tracing setup for the binaries

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is not set
pub const DEFAULT_LEVEL: &str = "info";

/// Installs the global tracing subscriber.
///
/// Priority (first match wins):
/// 1. `RUST_LOG_DISABLE` set - no tracing output at all
/// 2. `RUST_LOG` set - environment filter
/// 3. otherwise `default_level`
///
/// ```bash
/// RUST_LOG=amerike_telemetry_core=debug cargo run --bin publisher
/// RUST_LOG_DISABLE=1 cargo run --bin subscriber
/// ```
pub fn setup(default_level: &str) {
	crate::config::load_env_files();

	if std::env::var_os("RUST_LOG_DISABLE").is_some() {
		return;
	}

	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_level));

	let installed = tracing_subscriber::registry()
		.with(filter)
		.with(
			tracing_subscriber::fmt::layer()
				.with_target(true)
				.with_thread_ids(false)
				.with_thread_names(false)
				.with_file(false)
				.with_line_number(false)
				.compact(),
		)
		.try_init();
	if let Err(err) = installed {
		eprintln!("Tracing already initialised: {err}");
	}
}
