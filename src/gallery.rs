//! Template and phrase pools, and picking from them.

use std::path::{Path, PathBuf};

use rand::{Rng, seq::IndexedRandom as _};
use serde::Deserialize;
use tracing::debug;

use crate::{
	Error,
	geometry::{Direction, Point},
	layout::BubbleStyle,
	text::CaptionFont,
};

/// A template as written in configuration, before validation.
#[derive(Clone, Debug, Deserialize)]
pub struct TemplateRecord {
	pub path: PathBuf,
	pub text_bubble_coordinates: [i32; 2],
	#[serde(default = "default_direction")]
	pub direction: String,
}

fn default_direction() -> String {
	Direction::Any.to_string()
}

#[derive(Clone, Debug, PartialEq)]
pub struct Template {
	pub path: PathBuf,
	pub anchor: Point,
	pub direction: Direction,
}

impl Template {
	/// Relative paths are taken against `image_dir` when one is given.
	pub fn from_record(record: &TemplateRecord, image_dir: Option<&Path>) -> Result<Self, Error> {
		let direction = record
			.direction
			.parse()
			.map_err(|e| Error::InvalidConfiguration(format!("template {}: {e}", record.path.display())))?;
		let path = match image_dir {
			Some(dir) if record.path.is_relative() => dir.join(&record.path),
			_ => record.path.clone(),
		};
		let [x, y] = record.text_bubble_coordinates;
		Ok(Self {
			path,
			anchor: Point::new(x, y),
			direction,
		})
	}
}

/// One non-blank line per phrase.
pub fn parse_phrases(content: &str) -> Vec<String> {
	content.lines().map(str::trim).filter(|line| !line.is_empty()).map(str::to_owned).collect()
}

pub fn read_phrases(path: &Path) -> Result<Vec<String>, Error> {
	Ok(parse_phrases(&std::fs::read_to_string(path)?))
}

/// Everything a random caption can be drawn from. Immutable once built.
#[derive(Clone, Debug)]
pub struct Gallery {
	templates: Vec<Template>,
	phrases: Vec<String>,
}

impl Gallery {
	pub fn new(templates: Vec<Template>, phrases: Vec<String>) -> Result<Self, Error> {
		if templates.is_empty() {
			return Err(Error::InvalidConfiguration("no templates configured".to_owned()));
		}
		if phrases.is_empty() {
			return Err(Error::InvalidConfiguration("phrase pool is empty".to_owned()));
		}
		Ok(Self { templates, phrases })
	}

	/// Fails on the first invalid record; nothing from a bad set is kept.
	pub fn from_records(records: &[TemplateRecord], image_dir: Option<&Path>, phrases: Vec<String>) -> Result<Self, Error> {
		let templates = records.iter().map(|r| Template::from_record(r, image_dir)).collect::<Result<Vec<_>, _>>()?;
		debug!(templates = templates.len(), phrases = phrases.len(), "gallery loaded");
		Self::new(templates, phrases)
	}

	pub fn templates(&self) -> &[Template] {
		&self.templates
	}

	pub fn phrases(&self) -> &[String] {
		&self.phrases
	}

	pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> (&Template, &str) {
		// Both pools are non-empty by construction.
		let template = self.templates.choose(rng).unwrap_or(&self.templates[0]);
		let phrase = self.phrases.choose(rng).unwrap_or(&self.phrases[0]);
		(template, phrase)
	}

	/// Draw a random phrase onto a random template, returning PNG bytes.
	pub fn generate<R: Rng + ?Sized>(&self, font: &CaptionFont, style: &BubbleStyle, rng: &mut R) -> Result<Vec<u8>, Error> {
		let (template, phrase) = self.pick(rng);
		crate::generate(&template.path, phrase, template.anchor, template.direction, font, style, rng)
	}
}
