//! Version-control checkout support.
//!
//! Shells out to the git binary rather than linking one in; the mirror
//! only needs clone, checkout and rev-parse. Checkouts are packed into
//! gzipped tarballs so the cache stays a flat directory of files.

use std::time::Duration;

use super::DownloadError;

/// Whether a revision token is a concrete commit hash rather than a
/// symbolic name.
pub fn is_concrete_revision(revision: &str) -> bool {
	(revision.len() == 40 || revision.len() == 64) && revision.chars().all(|c| c.is_ascii_hexdigit())
}

/// Resolves a symbolic reference to a concrete commit hash with
/// `git ls-remote`. Best effort: any failure, including the timeout,
/// yields `None` and the caller falls back to HEAD identity.
pub async fn resolve_revision(url: &str, reference: Option<&str>, timeout: Duration) -> Option<String> {
	let output = tokio::time::timeout(
		timeout,
		tokio::process::Command::new("git")
			.arg("ls-remote")
			.arg(url)
			.arg(reference.unwrap_or("HEAD"))
			.output(),
	).await.ok()?.ok()?;

	if !output.status.success() {
		log::debug!("git ls-remote {} failed: {}", url, String::from_utf8_lossy(&output.stderr).trim());
		return None;
	}

	let stdout = String::from_utf8_lossy(&output.stdout);
	let hash = stdout.lines().next()?.split_whitespace().next()?.to_string();
	if is_concrete_revision(&hash) {
		Some(hash)
	} else {
		None
	}
}

/// Clones `url`, checks out `revision` when given, and packs the working
/// tree (`.git` excluded) into a gzipped tarball at `dest`.
pub async fn fetch_checkout(url: &str, revision: Option<&str>, dest: &std::path::Path, timeout: Duration) -> Result<(), DownloadError> {
	let checkout_dir = dest.with_extension("checkout");
	if checkout_dir.exists() {
		tokio::fs::remove_dir_all(&checkout_dir).await?;
	}

	let checkout_path = checkout_dir.display().to_string();
	run_git(&["clone", "--quiet", url, &checkout_path], timeout).await?;
	if let Some(revision) = revision {
		if revision != "HEAD" {
			run_git(&["-C", &checkout_path, "checkout", "--quiet", revision], timeout).await?;
		}
	}

	let pack_result = pack_checkout(&checkout_dir, dest);
	let _ = tokio::fs::remove_dir_all(&checkout_dir).await;
	pack_result
}

async fn run_git(args: &[&str], timeout: Duration) -> Result<(), DownloadError> {
	log::debug!("running git {:?}", args);
	let output = tokio::time::timeout(
		timeout,
		tokio::process::Command::new("git").args(args).output(),
	).await.map_err(|_| DownloadError::Timeout(timeout.as_secs()))??;

	if output.status.success() {
		Ok(())
	} else {
		Err(DownloadError::Vcs(format!(
			"git {} exited with {}: {}",
			args.first().copied().unwrap_or_default(),
			output.status,
			String::from_utf8_lossy(&output.stderr).trim(),
		)))
	}
}

fn pack_checkout(dir: &std::path::Path, dest: &std::path::Path) -> Result<(), DownloadError> {
	let file = std::fs::File::create(dest)?;
	let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
	let mut builder = tar::Builder::new(encoder);

	for entry in std::fs::read_dir(dir)? {
		let entry = entry?;
		if entry.file_name() == ".git" {
			continue;
		}
		let path = entry.path();
		let name = std::path::PathBuf::from(entry.file_name());
		if path.is_dir() {
			builder.append_dir_all(&name, &path)?;
		} else {
			builder.append_path_with_name(&path, &name)?;
		}
	}

	builder.into_inner()?.finish()?;
	Ok(())
}
