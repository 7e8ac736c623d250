use tracing::Level;

pub fn init(verbose: bool) {
	let level = if verbose { Level::DEBUG } else { Level::INFO };
	// Fails only when a global subscriber is already installed, which is then kept.
	tracing_subscriber::fmt().with_max_level(level).with_target(false).try_init().ok();
}
