//! Fetches resource content using each descriptor's download strategy.
//!
//! Strategies are a closed set dispatched here; the allow list deciding
//! which of them a run will touch lives in [`crate::config::MirrorConfig`]
//! and is applied upstream by the resource resolver. Every network attempt
//! runs under a timeout, and failures retry with exponential backoff
//! before giving up on that one resource.

pub mod vcs;

use std::time::Duration;

use thiserror::Error;

use crate::registry::package::{DownloadDescriptor, Locator, StrategyKind};

#[derive(Debug, Error)]
pub enum DownloadError {
	/// The descriptor's strategy is outside the closed fetchable set.
	/// Normally filtered out before fetching; this is the backstop.
	#[error("strategy `{0}` cannot be fetched.")]
	UnsupportedStrategy(String),
	/// The downloaded content hash does not match the declared checksum.
	#[error("downloaded content hash `{actual}` does not match declared checksum `{expected}`.")]
	ChecksumMismatch { expected: String, actual: String },
	#[error("fetch did not complete within {0} seconds.")]
	Timeout(u64),
	#[error("all {attempts} attempts failed, last error: {last}")]
	RetriesExhausted { attempts: u32, last: String },
	#[error("vcs command failed: {0}")]
	Vcs(String),
	#[error("descriptor for `{0}` has no usable locator.")]
	BadLocator(String),
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
}

pub struct Downloader {
	client: reqwest::Client,
	timeout: Duration,
	max_retries: u32,
}

impl Downloader {
	pub fn new(config: &crate::MirrorConfig) -> crate::Result<Downloader> {
		let client = reqwest::Client::builder()
			.https_only(config.https_only())
			.build()?;
		Ok(Downloader {
			client,
			timeout: Duration::from_secs(config.fetch_timeout_secs()),
			max_retries: config.max_retries(),
		})
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Fetches a descriptor's content into `dest`, a temp path inside the
	/// mirror's scratch directory. The caller hands the result to
	/// [`crate::cache::MirrorCache::put`] for verification and placement.
	pub async fn fetch(&self, descriptor: &DownloadDescriptor, dest: &std::path::Path) -> Result<(), DownloadError> {
		match &descriptor.strategy {
			StrategyKind::PlainArchive | StrategyKind::NoAutoExtract => {
				self.fetch_url(descriptor.locator.url(), dest).await
			}
			StrategyKind::MirrorList => self.fetch_mirror_list(descriptor, dest).await,
			StrategyKind::VcsCheckout => match &descriptor.locator {
				Locator::Vcs { url, revision } => {
					vcs::fetch_checkout(url, revision.as_deref(), dest, self.timeout).await
				}
				Locator::Url(url) => Err(DownloadError::BadLocator(url.clone())),
			},
			StrategyKind::Other(token) => Err(DownloadError::UnsupportedStrategy(token.clone())),
		}
	}

	/// Tries the primary locator, then each listed mirror in order.
	async fn fetch_mirror_list(&self, descriptor: &DownloadDescriptor, dest: &std::path::Path) -> Result<(), DownloadError> {
		let primary = descriptor.locator.url();
		let mut last = None;

		for url in std::iter::once(primary).chain(descriptor.mirrors.iter().map(String::as_str)) {
			match self.fetch_url(url, dest).await {
				Ok(()) => return Ok(()),
				Err(e) => {
					log::warn!("mirror {} failed: {}", url, e);
					last = Some(e);
				}
			}
		}

		Err(last.unwrap_or(DownloadError::BadLocator(primary.to_string())))
	}

	async fn fetch_url(&self, url: &str, dest: &std::path::Path) -> Result<(), DownloadError> {
		/* Local upstreams are a plain copy, no retries or throttling. */
		if let Some(path) = url.strip_prefix("file://") {
			tokio::fs::copy(path, dest).await?;
			return Ok(());
		}

		let mut attempts = 0u32;
		let mut backoff = Duration::from_secs(1);
		loop {
			let last = match tokio::time::timeout(self.timeout, self.fetch_url_once(url, dest)).await {
				Ok(Ok(())) => return Ok(()),
				Ok(Err(e)) => e.to_string(),
				Err(_) => DownloadError::Timeout(self.timeout.as_secs()).to_string(),
			};

			attempts += 1;
			if attempts > self.max_retries {
				return Err(DownloadError::RetriesExhausted { attempts, last });
			}
			log::warn!("fetch attempt {} for {} failed ({}), retrying in {:?}.", attempts, url, last, backoff);
			tokio::time::sleep(backoff).await;
			backoff *= 2;
		}
	}

	async fn fetch_url_once(&self, url: &str, dest: &std::path::Path) -> Result<(), DownloadError> {
		log::info!("downloading {}", url);
		let content = self.client
			.get(url)
			.send()
			.await?
			.error_for_status()?
			.bytes()
			.await?
			.to_vec();

		let mut download_file = tokio::fs::File::create(dest).await?;
		tokio::io::copy(&mut content.as_slice(), &mut download_file).await?;
		Ok(())
	}
}
