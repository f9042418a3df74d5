use pkgmirror::registry::FileRegistry;
use pkgmirror::registry::package::StrategyKind;

#[tokio::main]
async fn main() {
	env_logger::init();

	let mut opts;

	/* Parse console input */
	let parsed_options = {
		let args: Vec<String> = std::env::args().collect();

		opts = getopts::Options::new();
		opts.optflag("h", "help", "Show help");
		opts.optopt("d", "directory", "Mirror directory to create or update", "DIR");
		opts.optopt("r", "registry", "Directory of registry package documents", "DIR");
		opts.optopt("b", "base-address", "Address the redirection shim substitutes for mirrored locators", "URL");
		opts.optflag("", "with-deps", "Mirror the transitive dependency set, not just the named packages");
		opts.optflag("", "include-build", "Also follow build-only dependencies");
		opts.optflag("", "include-optional", "Also follow optional dependencies");
		opts.optmulti("", "package-variant", "Variant token forwarded to the registry, repeatable", "TOK");
		opts.optmulti("", "collections", "Collection whose pin should be recorded, repeatable; default all", "NAME");
		opts.optmulti("", "strategy", "Allowed download strategy, repeatable; default the built-in set", "KIND");
		opts.optflag("", "update", "Diff against the previous run manifest and skip unchanged packages");
		opts.optflag("", "prune", "After mirroring, delete payloads the redirection map no longer references");
		opts.optflag("", "verify", "After mirroring, verify the mirror directory");
		opts.optflag("", "check-digests", "With --verify, also recompute payload checksums (slow)");
		opts.optflag("", "config-only", "Rewrite the mirror documents without fetching anything");
		opts.optopt("", "delay", "Seconds to wait between external fetches", "N");
		opts.optflag("", "no-checksums", "Skip checksum verification at placement time");
		opts.parsing_style(getopts::ParsingStyle::FloatingFrees);

		let parsed_options = match opts.parse(&args[1..]) {
			Ok(m) => m,
			Err(e) => {
				eprintln!("Unable to parse options: {}", e);
				std::process::exit(2)
			}
		};

		if parsed_options.opt_present("h") {
			eprintln!("{}", opts.usage("Usage: pkgmirror-terminal mirror <names...> --directory DIR --registry DIR"));
			return;
		}

		parsed_options
	};

	if parsed_options.free.first().map(String::as_str) != Some("mirror") {
		eprintln!("{}", opts.usage("Usage: pkgmirror-terminal mirror <names...> --directory DIR --registry DIR"));
		std::process::exit(2);
	}
	let names: Vec<String> = parsed_options.free[1..].to_vec();

	let directory = match parsed_options.opt_str("directory").map(std::path::PathBuf::from).or_else(pkgmirror::config::default_root) {
		Some(directory) => directory,
		None => {
			log::error!("--directory is required and no default mirror root could be discovered.");
			std::process::exit(2);
		}
	};
	let registry_dir = match parsed_options.opt_str("registry") {
		Some(dir) => std::path::PathBuf::from(dir),
		None => {
			log::error!("--registry is required.");
			std::process::exit(2);
		}
	};

	let base_address = parsed_options.opt_str("base-address")
		.unwrap_or_else(|| format!("file://{}", directory.display()));

	let mut config = pkgmirror::MirrorConfig::new(&directory, base_address);
	if let Some(delay) = parsed_options.opt_str("delay") {
		match delay.parse::<u64>() {
			Ok(delay) => config.set_fetch_delay_secs(delay),
			Err(_) => {
				log::error!("--delay expects a number of seconds.");
				std::process::exit(2);
			}
		}
	}
	if parsed_options.opt_present("no-checksums") {
		config.set_do_checksums(false);
	}
	let strategies = parsed_options.opt_strs("strategy");
	if !strategies.is_empty() {
		config.set_allowed_strategies(strategies.iter().map(|s| StrategyKind::from_token(s)).collect());
	}

	let registry = match FileRegistry::open(&registry_dir) {
		Ok(registry) => registry,
		Err(e) => {
			log::error!("failed to open registry: {}", e);
			std::process::exit(1);
		}
	};

	let options = pkgmirror::mirror::MirrorOptions {
		with_deps: parsed_options.opt_present("with-deps"),
		include_build: parsed_options.opt_present("include-build"),
		include_optional: parsed_options.opt_present("include-optional"),
		variants: parsed_options.opt_strs("package-variant"),
		collections: parsed_options.opt_strs("collections"),
		update: parsed_options.opt_present("update"),
		config_only: parsed_options.opt_present("config-only"),
	};

	let report = match pkgmirror::mirror::mirror_packages(&config, &registry, &names, &options).await {
		Ok(report) => report,
		Err(e) => {
			log::error!("mirror run failed: {}", e);
			std::process::exit(1);
		}
	};

	println!(
		"{} packages, {} resources: {} fetched, {} reused, {} skipped, {} failed ({} bytes).",
		report.stats.packages, report.stats.resources, report.stats.fetched,
		report.stats.reused, report.stats.skipped, report.stats.failed, report.stats.bytes,
	);
	for skipped in &report.skipped {
		println!("warning: skipped {} of {} (strategy `{}` outside the allow list).", skipped.locator, skipped.package, skipped.strategy);
	}
	for failure in &report.failures {
		println!("warning: failed {} of {}: {}", failure.locator, failure.package, failure.error);
	}
	for stale in &report.stale {
		println!("note: `{}` is stale; pass --prune to delete unreferenced payloads.", stale);
	}

	if parsed_options.opt_present("prune") {
		match pkgmirror::mirror::prune_mirror(&config) {
			Ok(removed) => {
				for filename in removed {
					println!("pruned {}.", filename);
				}
			}
			Err(e) => {
				log::error!("prune failed: {}", e);
				std::process::exit(1);
			}
		}
	}

	if parsed_options.opt_present("verify") {
		let report = match pkgmirror::verify::verify_mirror(&directory, parsed_options.opt_present("check-digests")).await {
			Ok(report) => report,
			Err(e) => {
				log::error!("verification failed to run: {}", e);
				std::process::exit(1);
			}
		};
		for warning in &report.warnings {
			println!("verify warning: {}", warning);
		}
		for error in &report.errors {
			println!("verify error: {}", error);
		}
		if let Some(total) = report.total_bytes {
			println!("verified mirror holds {} payload bytes.", total);
		}
		if !report.ok() {
			std::process::exit(1);
		}
	}

	/* Partial per-resource failures still exit 0; they are warnings. */
}
