//! Ctrl+C handling for the binaries

use std::future::Future;
use std::task::Poll;

use tracing::error;

/// Installs the Ctrl+C listener and returns a future resolving on the first
/// Ctrl+C after this call.
///
/// `tokio::signal::ctrl_c` only registers its handler when first polled, so
/// the listener is polled once here. A Ctrl+C arriving before the returned
/// future is awaited is then still observed instead of killing the process.
/// If the handler cannot be installed the future never resolves.
pub async fn ctrl_c() -> impl Future<Output = ()> {
	let mut signal = Box::pin(tokio::signal::ctrl_c());
	let first = futures::poll!(signal.as_mut());
	async move {
		let result = match first {
			| Poll::Ready(result) => result,
			| Poll::Pending => signal.await,
		};
		if let Err(err) = result {
			error!(error = %err, "Failed to listen for Ctrl+C");
			std::future::pending::<()>().await;
		}
	}
}
