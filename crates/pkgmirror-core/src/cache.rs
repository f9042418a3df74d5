//! Flat on-disk store for mirrored payload files.
//!
//! The store is append-only: an entry that exists and passes the sanity
//! check is never rewritten, which is what makes repeated mirror runs
//! idempotent. Placement is atomic; content arrives in the scratch
//! directory, is verified there, and only then moves into place.

use std::collections::HashSet;

use serde::{Serialize, Deserialize};

use crate::registry::package::Checksum;

/// Scratch directory for in-flight fetches, inside the mirror root so the
/// final move is a same-filesystem rename in the common case.
pub(crate) const SCRATCH_DIR: &str = "tmp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
	pub identifier: String,
	pub filename: String,
	pub size: u64,
	/// Whether the payload was verified against a declared checksum when
	/// it was placed.
	pub verified: bool,
}

pub struct MirrorCache {
	root: std::path::PathBuf,
}

impl MirrorCache {
	pub fn open(root: impl AsRef<std::path::Path>) -> crate::Result<MirrorCache> {
		let root = root.as_ref().to_path_buf();
		std::fs::create_dir_all(root.join(SCRATCH_DIR))?;
		Ok(MirrorCache { root })
	}

	pub fn root(&self) -> &std::path::Path {
		&self.root
	}

	pub fn scratch_dir(&self) -> std::path::PathBuf {
		self.root.join(SCRATCH_DIR)
	}

	/// Computes the payload filename for an identifier, rejecting anything
	/// that would escape the mirror directory.
	pub fn filename(identifier: &str, extension: &str) -> crate::Result<String> {
		let filename = format!("{}{}", identifier, extension);
		let escapes = filename.is_empty()
			|| filename.starts_with('.')
			|| filename.contains('/')
			|| filename.contains('\\')
			|| filename.contains("..");
		if escapes {
			return Err(crate::Error::PathSecurity(filename));
		}
		Ok(filename)
	}

	pub fn entry_path(&self, filename: &str) -> std::path::PathBuf {
		self.root.join(filename)
	}

	/// Returns the existing entry for an identifier when it is present and
	/// passes the sanity check (a regular, non-empty file).
	pub fn get(&self, identifier: &str, extension: &str) -> crate::Result<Option<CacheEntry>> {
		let filename = Self::filename(identifier, extension)?;
		let metadata = match std::fs::metadata(self.entry_path(&filename)) {
			Ok(metadata) => metadata,
			Err(_) => return Ok(None),
		};
		if !metadata.is_file() || metadata.len() == 0 {
			return Ok(None);
		}
		Ok(Some(CacheEntry {
			identifier: identifier.to_string(),
			filename,
			size: metadata.len(),
			verified: false,
		}))
	}

	/// Verifies and places fetched content.
	///
	/// An already present entry wins; the fetched temp file is discarded.
	/// A checksum mismatch deletes the temp file and raises rather than
	/// leaving a corrupt entry. The move is a rename, falling back to
	/// copy-then-delete across filesystems.
	pub fn put(&self, identifier: &str, temp: &std::path::Path, extension: &str, checksum: &Checksum) -> crate::Result<CacheEntry> {
		if let Some(existing) = self.get(identifier, extension)? {
			log::info!("cache entry {} already present, skipping placement.", existing.filename);
			let _ = std::fs::remove_file(temp);
			return Ok(existing);
		}

		let filename = Self::filename(identifier, extension)?;
		let target = self.entry_path(&filename);

		let verified = if let Checksum::Sha256(expected) = checksum {
			let expected = expected.to_ascii_lowercase();
			let actual = sha256::try_digest(temp)?;
			if actual != expected {
				let _ = std::fs::remove_file(temp);
				return Err(crate::download::DownloadError::ChecksumMismatch { expected, actual }.into());
			}
			true
		} else {
			false
		};

		let size = std::fs::metadata(temp)?.len();
		if std::fs::rename(temp, &target).is_err() {
			/* Cross-filesystem move. */
			std::fs::copy(temp, &target)?;
			std::fs::remove_file(temp)?;
		}

		log::info!("placed {} ({} bytes).", filename, size);
		Ok(CacheEntry { identifier: identifier.to_string(), filename, size, verified })
	}

	/// Lists payload entries. Documents and the scratch directory are not
	/// payloads.
	pub fn list(&self) -> crate::Result<Vec<CacheEntry>> {
		let mut entries = Vec::new();
		for entry in std::fs::read_dir(&self.root)? {
			let entry = entry?;
			let metadata = entry.metadata()?;
			if !metadata.is_file() {
				continue;
			}
			let filename = entry.file_name().to_string_lossy().to_string();
			if is_document(&filename) {
				continue;
			}
			let identifier = filename.split('.').next().unwrap_or(&filename).to_string();
			entries.push(CacheEntry { identifier, filename, size: metadata.len(), verified: false });
		}
		entries.sort_by(|lhs, rhs| lhs.filename.cmp(&rhs.filename));
		Ok(entries)
	}

	/// Deletes payload files not named in `keep`. Opt-in only; an update
	/// run never prunes implicitly.
	pub fn prune(&self, keep: &HashSet<String>) -> crate::Result<Vec<String>> {
		let mut removed = Vec::new();
		for entry in self.list()? {
			if !keep.contains(&entry.filename) {
				std::fs::remove_file(self.entry_path(&entry.filename))?;
				log::info!("pruned {}.", entry.filename);
				removed.push(entry.filename);
			}
		}
		Ok(removed)
	}
}

/// Whether a filename is one of the mirror's own documents rather than a
/// payload.
pub(crate) fn is_document(filename: &str) -> bool {
	filename == crate::config::CONFIG_FILENAME
		|| filename == crate::redirect::MAP_FILENAME
		|| filename == crate::manifest::MANIFEST_FILENAME
		|| filename == crate::resource::TRANSPARENCY_FILENAME
}
