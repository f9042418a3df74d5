//! Ties resolution, fetching, caching and redirection together into a
//! single mirror run.
//!
//! Only two things abort a run: a configuration error before any fetch,
//! and a request that resolves to nothing. Everything else (a package
//! missing from the registry, a descriptor outside the strategy allow
//! list, a fetch that exhausts its retries, a checksum mismatch) is
//! recorded in the report and the run carries on; the failed resource is
//! simply left out of this run's redirection map.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::cache::MirrorCache;
use crate::config::{MirrorConfig, MirrorDocument, CONFIG_FILENAME};
use crate::dependency_resolver::{self, ResolveOptions};
use crate::download::{vcs, Downloader};
use crate::manifest::{diff_manifest, ManifestPackage, RunManifest, RunStats, MANIFEST_FILENAME};
use crate::redirect::{RedirectionMap, MAP_FILENAME};
use crate::registry::Registry;
use crate::registry::package::{Checksum, Locator, PackageIdentifier, StrategyKind};
use crate::resource::{self, SkippedResource, TRANSPARENCY_FILENAME};

#[derive(Debug, Default, Clone)]
pub struct MirrorOptions {
	/// Expand to the transitive dependency set before mirroring.
	pub with_deps: bool,
	pub include_build: bool,
	pub include_optional: bool,
	/// Opaque variant tokens forwarded to the registry.
	pub variants: Vec<String>,
	/// Restrict which collection pins are recorded. Empty records all.
	pub collections: Vec<String>,
	/// Diff against the previous run manifest and skip unchanged packages'
	/// revision resolution.
	pub update: bool,
	/// Rewrite the documents without fetching anything.
	pub config_only: bool,
}

#[derive(Debug, Clone)]
pub struct ResourceFailure {
	pub package: PackageIdentifier,
	pub locator: String,
	pub error: String,
}

#[derive(Debug, Default, Clone)]
pub struct MirrorReport {
	pub stats: RunStats,
	pub failures: Vec<ResourceFailure>,
	pub skipped: Vec<SkippedResource>,
	/// Packages from the prior manifest absent from this run. Prune
	/// candidates, nothing more; pruning stays a separate step.
	pub stale: Vec<String>,
}

impl MirrorReport {
	pub fn fully_mirrored(&self) -> bool {
		self.failures.is_empty()
	}
}

pub async fn mirror_packages<R: Registry>(
	config: &MirrorConfig,
	registry: &R,
	names: &[String],
	options: &MirrorOptions,
) -> crate::Result<MirrorReport> {
	if names.is_empty() {
		return Err(crate::Error::Config("no packages requested.".to_string()));
	}

	let resolved = dependency_resolver::resolve_dependencies(registry, names, &options.variants, ResolveOptions {
		transitive: options.with_deps,
		include_build: options.include_build,
		include_optional: options.include_optional,
	})?;
	if resolved.is_empty() {
		return Err(crate::Error::NothingResolved);
	}
	log::info!("resolved {} packages.", resolved.len());

	let cache = MirrorCache::open(config.root())?;
	let downloader = Downloader::new(config)?;
	let fetch_timeout = Duration::from_secs(config.fetch_timeout_secs());

	let prior = if options.update {
		RunManifest::load_from(&config.root().join(MANIFEST_FILENAME)).ok()
	} else {
		None
	};
	let (unchanged, stale) = match &prior {
		Some(prior) => {
			let diff = diff_manifest(prior, resolved.packages());
			log::info!("incremental diff: {} unchanged, {} new, {} stale.", diff.unchanged.len(), diff.new.len(), diff.stale.len());
			(diff.unchanged.into_iter().collect::<HashSet<String>>(), diff.stale)
		}
		None => (HashSet::new(), Vec::new()),
	};

	let mut report = MirrorReport { stale, ..Default::default() };
	report.stats.packages = resolved.len() as u64;

	let mut map = RedirectionMap::new();
	let mut transparency = BTreeMap::<String, String>::new();
	let mut manifest_packages = Vec::<ManifestPackage>::new();

	for package in resolved.packages() {
		let (resources, skipped) = resource::collect_resources(package, config.allowed_strategies());
		report.stats.skipped += skipped.len() as u64;
		report.skipped.extend(skipped);

		let package_unchanged = unchanged.contains(package.name());
		let mut descriptors = Vec::new();

		for mut resource in resources {
			report.stats.resources += 1;

			/* Upgrade symbolic checkout revisions to concrete hashes
			   before identity assignment. Unchanged packages and
			   config-only runs skip the network round trip. */
			let resolved_revision = match &resource.descriptor.locator {
				Locator::Vcs { url, revision }
					if !options.config_only
						&& !package_unchanged
						&& !revision.as_deref().map_or(false, vcs::is_concrete_revision) =>
				{
					let resolved = vcs::resolve_revision(url, revision.as_deref(), fetch_timeout).await;
					if resolved.is_none() {
						log::warn!("could not resolve a concrete revision for {}, using HEAD identity.", url);
					}
					resolved
				}
				_ => None,
			};
			if let Some(concrete) = resolved_revision {
				if let Locator::Vcs { revision, .. } = &mut resource.descriptor.locator {
					*revision = Some(concrete);
				}
			}

			let identifier = resource::assign_identifier(&resource.descriptor);
			let extension = resource::detect_extension(&resource.descriptor);
			let filename = match MirrorCache::filename(&identifier, &extension) {
				Ok(filename) => filename,
				Err(e) => {
					log::error!("{}", e);
					report.stats.failed += 1;
					report.failures.push(ResourceFailure {
						package: resource.package.clone(),
						locator: resource.descriptor.locator.url().to_string(),
						error: e.to_string(),
					});
					descriptors.push(resource.descriptor);
					continue;
				}
			};

			descriptors.push(resource.descriptor.clone());

			let entry = if let Some(existing) = cache.get(&identifier, &extension)? {
				log::debug!("{} already mirrored as {}.", resource.descriptor.locator, existing.filename);
				report.stats.reused += 1;
				Some(existing)
			} else if options.config_only {
				report.stats.skipped += 1;
				None
			} else {
				let temp = cache.scratch_dir().join(format!("{}.part", filename));
				let checksum = if config.do_checksums() {
					resource.descriptor.checksum.clone()
				} else {
					Checksum::Unchecked
				};

				let fetched = match downloader.fetch(&resource.descriptor, &temp).await {
					Ok(()) => match cache.put(&identifier, &temp, &extension, &checksum) {
						Ok(entry) => {
							report.stats.fetched += 1;
							report.stats.bytes += entry.size;
							Some(entry)
						}
						Err(e) => {
							log::warn!("failed to place {}: {}", resource.descriptor.locator, e);
							report.stats.failed += 1;
							report.failures.push(ResourceFailure {
								package: resource.package.clone(),
								locator: resource.descriptor.locator.url().to_string(),
								error: e.to_string(),
							});
							None
						}
					},
					Err(e) => {
						log::warn!("failed to fetch {}: {}", resource.descriptor.locator, e);
						report.stats.failed += 1;
						report.failures.push(ResourceFailure {
							package: resource.package.clone(),
							locator: resource.descriptor.locator.url().to_string(),
							error: e.to_string(),
						});
						None
					}
				};

				/* Upstream throttle, kept even though fetches are
				   sequential. */
				if config.fetch_delay_secs() > 0 {
					tokio::time::sleep(Duration::from_secs(config.fetch_delay_secs())).await;
				}

				fetched
			};

			if let Some(entry) = entry {
				map.register(resource.descriptor.locator.url(), &entry.filename);
				if resource.descriptor.strategy == StrategyKind::MirrorList {
					for mirror in &resource.descriptor.mirrors {
						map.register(mirror, &entry.filename);
					}
				}
				transparency.insert(resource::locator_key(&resource.descriptor), identifier);
			}
		}

		manifest_packages.push(ManifestPackage {
			name: package.name().to_string(),
			version: package.version().to_string(),
			descriptors,
		});
	}

	write_documents(config, registry, options, &report.stats, map, &transparency, manifest_packages)?;

	log::info!(
		"mirror run complete: {} fetched, {} reused, {} skipped, {} failed.",
		report.stats.fetched, report.stats.reused, report.stats.skipped, report.stats.failed,
	);
	Ok(report)
}

fn write_documents<R: Registry>(
	config: &MirrorConfig,
	registry: &R,
	options: &MirrorOptions,
	stats: &RunStats,
	map: RedirectionMap,
	transparency: &BTreeMap<String, String>,
	packages: Vec<ManifestPackage>,
) -> crate::Result<()> {
	let timestamp = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_secs())
		.unwrap_or(0);

	let collections: BTreeMap<_, _> = registry.collections()
		.into_iter()
		.filter(|(name, _)| options.collections.is_empty() || options.collections.contains(name))
		.collect();

	let document = MirrorDocument {
		collections: collections.clone(),
		timestamp,
		cache_root: config.root().display().to_string(),
		base_address: config.base_address().to_string(),
	};
	document.save_to(&config.root().join(CONFIG_FILENAME))?;

	map.save_to(&config.root().join(MAP_FILENAME))?;

	std::fs::write(
		config.root().join(TRANSPARENCY_FILENAME),
		serde_json::to_string_pretty(transparency)?,
	)?;

	let manifest = RunManifest { created: timestamp, collections, stats: *stats, packages };
	manifest.save_to(&config.root().join(MANIFEST_FILENAME))?;

	Ok(())
}

/// Deletes cache entries the persisted redirection map no longer
/// references. A separate opt-in step, never part of an update.
pub fn prune_mirror(config: &MirrorConfig) -> crate::Result<Vec<String>> {
	let map_path = config.root().join(MAP_FILENAME);
	if !map_path.is_file() {
		return Err(crate::Error::Config("no redirection map found; run a mirror first.".to_string()));
	}
	let map = RedirectionMap::load_from(&map_path)?;
	let keep: HashSet<String> = map.referenced_filenames().into_iter().collect();

	let cache = MirrorCache::open(config.root())?;
	cache.prune(&keep)
}
