use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr as _, eyre};
use serde::Deserialize;
use tracing::warn;

use crate::{
	gallery::{self, Gallery, TemplateRecord},
	layout::BubbleStyle,
	text::CaptionFont,
};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	/// Caption font file, otf or ttf.
	pub font: PathBuf,
	/// Base for relative template paths.
	pub image_dir: Option<PathBuf>,
	/// Newline-delimited phrase pool.
	pub phrases: Option<PathBuf>,
	pub templates: Vec<TemplateRecord>,
	pub style: BubbleStyle,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			font: PathBuf::from("assets/caption_font.otf"),
			image_dir: None,
			phrases: None,
			templates: Vec::new(),
			style: BubbleStyle::default(),
		}
	}
}

impl AppConfig {
	pub fn read(path: Option<&Path>) -> Result<Self> {
		let app_name = env!("CARGO_PKG_NAME");

		let mut builder = config::Config::builder();
		match path {
			Some(path) => {
				let path_str = path.display().to_string();
				builder = builder.add_source(config::File::with_name(&path_str).required(true));
			}
			None => {
				let xdg_dirs = xdg::BaseDirectories::new();
				let xdg_conf_dir = xdg_dirs.get_config_home().ok_or_else(|| eyre!("Could not determine XDG config home"))?.display().to_string();

				let locations = [
					format!("{xdg_conf_dir}/{app_name}"),
					format!("{xdg_conf_dir}/{app_name}/config"), //
				];
				for location in locations.iter() {
					builder = builder.add_source(config::File::with_name(location).required(false));
				}
			}
		}
		builder = builder.add_source(config::Environment::with_prefix("XSAY").prefix_separator("_").separator("__").try_parsing(true));

		let raw: config::Config = builder.build()?;
		raw.try_deserialize().wrap_err("Config file does not exist or is invalid")
	}

	/// Like [`Self::read`], except that a broken implicit (XDG or env) configuration falls back to defaults.
	/// An explicitly requested file must still load.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		Self::fall_back_unless_explicit(path.is_some(), Self::read(path))
	}

	fn fall_back_unless_explicit(explicit: bool, read: Result<Self>) -> Result<Self> {
		match read {
			Ok(config) => Ok(config),
			Err(e) if !explicit => {
				warn!("Ignoring unreadable config, using defaults: {e:#}");
				Ok(Self::default())
			}
			Err(e) => Err(e),
		}
	}

	pub fn caption_font(&self) -> Result<CaptionFont> {
		Ok(CaptionFont::load(&self.font, self.style.font_size)?)
	}

	pub fn gallery(&self) -> Result<Gallery> {
		let phrases_path = self.phrases.as_deref().ok_or_else(|| eyre!("No phrase file configured (set `phrases`)"))?;
		let phrases = gallery::read_phrases(phrases_path).wrap_err_with(|| format!("Failed to read phrases from {}", phrases_path.display()))?;
		let gallery = Gallery::from_records(&self.templates, self.image_dir.as_deref(), phrases)?;
		Ok(gallery)
	}
}
