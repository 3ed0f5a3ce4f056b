use std::path::PathBuf;

/// I/O failure of the fallback spool.
///
/// Recoverable at loop level: the affected reading is lost from the
/// fallback but the loop keeps going.
#[derive(Debug, thiserror::Error)]
pub enum SpoolError {
	/// Spool directory could not be created
	#[error("Failed to create spool directory {}: {source}", path.display())]
	CreateDir {
		path: PathBuf,
		source: std::io::Error,
	},

	/// Spool file could not be created
	#[error("Failed to open spool file {}: {source}", path.display())]
	Open {
		path: PathBuf,
		source: std::io::Error,
	},

	/// Entry could not be written or flushed
	#[error("Failed to write to spool file {}: {source}", path.display())]
	Write {
		path: PathBuf,
		source: std::io::Error,
	},

	/// Flushing or syncing on close failed
	#[error("Failed to close spool file {}: {source}", path.display())]
	Close {
		path: PathBuf,
		source: std::io::Error,
	},
}

impl SpoolError {
	/// File or directory the error refers to
	pub fn path(&self) -> &std::path::Path {
		match self {
			| SpoolError::CreateDir { path, .. }
			| SpoolError::Open { path, .. }
			| SpoolError::Write { path, .. }
			| SpoolError::Close { path, .. } => path,
		}
	}
}
