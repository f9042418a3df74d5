//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	/// A malformed or missing metadata document. Fatal, nothing is fetched.
	#[error("configuration error: {0}")]
	Config(String),
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("download failed: {0}")]
	Download(#[from] crate::download::DownloadError),
	/// A computed filename or locator would escape the mirror directory.
	/// Fatal for the one resource concerned, which is never written.
	#[error("filename `{0}` would escape the mirror directory.")]
	PathSecurity(String),
	/// The request expanded to an empty package set. Fatal, the run would
	/// otherwise produce an empty redirection map.
	#[error("no packages resolved from the requested names.")]
	NothingResolved,
}
