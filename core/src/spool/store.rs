use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::error::SpoolError;
use super::line::SpoolLine;
use crate::reading::Reading;
use crate::topic::Topic;

/// Upper bound on `_<n>` suffixes tried when a file name is already taken
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// A reading that could not be delivered, with the topic it was meant for
/// and the time of the failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolEntry {
	pub reading: Reading,
	pub topic: Topic,
	pub timestamp: DateTime<Local>,
}

impl SpoolEntry {
	pub fn new(
		reading: Reading,
		topic: Topic,
		timestamp: DateTime<Local>,
	) -> Self {
		Self {
			reading,
			topic,
			timestamp,
		}
	}

	/// On-disk representation of this entry
	pub fn line(&self) -> SpoolLine {
		SpoolLine::new(self.reading.payload(), self.topic.clone())
	}
}

/// Summary of a spool file that has been flushed and closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSpool {
	pub path: PathBuf,
	pub lines: usize,
}

#[derive(Debug)]
struct OpenSpool {
	path: PathBuf,
	file: File,
	lines: usize,
}

/// Append-only fallback log with at most one open file at a time.
///
/// Files live in `dir` and are named `offline_<YYYYmmdd_HHMMSS>.txt` after
/// the moment they were opened; a `_<n>` suffix is added if that name is
/// already taken, so a closed file is never appended to again.
#[derive(Debug)]
pub struct SpoolStore<C = SystemClock> {
	dir: PathBuf,
	clock: C,
	open: Option<OpenSpool>,
	files_created: usize,
}

impl SpoolStore<SystemClock> {
	/// Creates a store writing into `dir`. Nothing touches the filesystem
	/// until the first failure is recorded.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self::with_clock(dir, SystemClock)
	}
}

impl<C: Clock> SpoolStore<C> {
	pub fn with_clock(dir: impl Into<PathBuf>, clock: C) -> Self {
		Self {
			dir: dir.into(),
			clock,
			open: None,
			files_created: 0,
		}
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Current time according to the store's clock
	pub fn now(&self) -> DateTime<Local> {
		self.clock.now()
	}

	pub fn is_open(&self) -> bool {
		self.open.is_some()
	}

	/// Path of the open spool file, if any
	pub fn current_path(&self) -> Option<&Path> {
		self.open.as_ref().map(|spool| spool.path.as_path())
	}

	/// Number of spool files created by this store
	pub fn files_created(&self) -> usize {
		self.files_created
	}

	/// Appends an entry, opening a new spool file first if none is open.
	///
	/// The line is flushed before this returns. Returns the path written to.
	/// If the write itself fails the file stays open for the rest of the
	/// streak.
	pub async fn record_failure(
		&mut self,
		entry: &SpoolEntry,
	) -> Result<PathBuf, SpoolError> {
		let spool = match self.open.take() {
			| Some(spool) => spool,
			| None => self.open_new().await?,
		};
		let spool = self.open.insert(spool);

		let mut text = entry.line().to_string();
		text.push('\n');
		let written: std::io::Result<()> = async {
			spool.file.write_all(text.as_bytes()).await?;
			spool.file.flush().await
		}
		.await;
		written.map_err(|source| SpoolError::Write {
			path: spool.path.clone(),
			source,
		})?;

		spool.lines += 1;
		debug!(
			path = %spool.path.display(),
			lines = spool.lines,
			"Spooled undelivered reading"
		);
		Ok(spool.path.clone())
	}

	/// Closes the open spool file, if any. A no-op when nothing is open.
	pub async fn record_success(
		&mut self,
	) -> Result<Option<ClosedSpool>, SpoolError> {
		self.close().await
	}

	/// Flushes and closes the open spool file, if any.
	///
	/// The handle is released even when flushing fails.
	pub async fn close(&mut self) -> Result<Option<ClosedSpool>, SpoolError> {
		let Some(OpenSpool {
			path,
			mut file,
			lines,
		}) = self.open.take()
		else {
			return Ok(None);
		};

		let closed: std::io::Result<()> = async {
			file.flush().await?;
			file.sync_all().await
		}
		.await;
		drop(file);
		closed.map_err(|source| SpoolError::Close {
			path: path.clone(),
			source,
		})?;

		info!(path = %path.display(), lines, "Closed spool file");
		Ok(Some(ClosedSpool { path, lines }))
	}

	async fn open_new(&mut self) -> Result<OpenSpool, SpoolError> {
		fs::create_dir_all(&self.dir).await.map_err(|source| {
			SpoolError::CreateDir {
				path: self.dir.clone(),
				source,
			}
		})?;

		let stamp = self.clock.now().format("%Y%m%d_%H%M%S").to_string();
		let mut attempt: u32 = 0;
		loop {
			let name = if attempt == 0 {
				format!("offline_{stamp}.txt")
			} else {
				format!("offline_{stamp}_{attempt}.txt")
			};
			let path = self.dir.join(name);
			match OpenOptions::new()
				.append(true)
				.create_new(true)
				.open(&path)
				.await
			{
				| Ok(file) => {
					self.files_created += 1;
					info!(path = %path.display(), "Opened spool file");
					return Ok(OpenSpool {
						path,
						file,
						lines: 0,
					});
				}
				| Err(err)
					if err.kind() == ErrorKind::AlreadyExists
						&& attempt < MAX_NAME_ATTEMPTS =>
				{
					attempt += 1;
				}
				| Err(source) => return Err(SpoolError::Open { path, source }),
			}
		}
	}
}
