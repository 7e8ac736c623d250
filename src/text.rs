use std::{path::Path, sync::Arc};

use tracing::debug;

use crate::{Error, geometry::Size};

/// Extra space between stacked lines, as a multiple of the font size.
const LINE_HEIGHT_EM: f32 = 1.2;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextMetrics {
	/// Ink box measured from the pen origin, so `width` includes the left side bearing.
	pub extent: Size,
	/// Distance from the top of the ink box down to the first baseline.
	pub ascent: f32,
}

pub trait TextMeasurer {
	fn measure(&self, text: &str) -> Result<TextMetrics, Error>;
}

/// Monospace approximation, for when laying out real glyphs is not worth it.
#[derive(Clone, Copy, Debug)]
pub struct HeuristicMeasurer {
	pub font_size: u32,
}

impl TextMeasurer for HeuristicMeasurer {
	fn measure(&self, text: &str) -> Result<TextMetrics, Error> {
		let font_size = self.font_size as f32;
		let char_width = font_size * 0.6; // Monospace chars are ~0.6 of font size
		let lines: Vec<&str> = text.lines().collect();
		let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
		let height = if lines.is_empty() { 0.0 } else { font_size + (lines.len() - 1) as f32 * font_size * LINE_HEIGHT_EM };
		Ok(TextMetrics {
			extent: Size::new((longest as f32 * char_width).ceil() as u32, height.ceil() as u32),
			ascent: font_size * 0.8,
		})
	}
}

/// The caption font, kept in a database of its own so the renderer cannot fall back to anything else.
#[derive(Clone, Debug)]
pub struct CaptionFont {
	fontdb: Arc<fontdb::Database>,
	family: String,
	size: u32,
}

impl CaptionFont {
	pub fn load(path: &Path, size: u32) -> Result<Self, Error> {
		let mut fontdb = fontdb::Database::new();
		fontdb.load_font_file(path).map_err(|e| Error::FontLoad(format!("{}: {e}", path.display())))?;
		Self::from_database(fontdb, size).map_err(|e| match e {
			Error::FontLoad(msg) => Error::FontLoad(format!("{}: {msg}", path.display())),
			other => other,
		})
	}

	pub fn from_data(data: Vec<u8>, size: u32) -> Result<Self, Error> {
		let mut fontdb = fontdb::Database::new();
		fontdb.load_font_data(data);
		Self::from_database(fontdb, size)
	}

	fn from_database(fontdb: fontdb::Database, size: u32) -> Result<Self, Error> {
		let family = fontdb
			.faces()
			.find_map(|face| face.families.first().map(|(name, _)| name.clone()))
			.ok_or_else(|| Error::FontLoad("no usable font face".to_owned()))?;
		debug!(%family, size, "loaded caption font");
		Ok(Self {
			fontdb: Arc::new(fontdb),
			family,
			size,
		})
	}

	/// A font with no faces behind it: shapes render, text silently does not.
	#[cfg(test)]
	pub(crate) fn blank(size: u32) -> Self {
		Self {
			fontdb: Arc::new(fontdb::Database::new()),
			family: "blank".to_owned(),
			size,
		}
	}

	/// First real face found among common system locations; tests that need ink skip without one.
	#[cfg(test)]
	pub(crate) fn system(size: u32) -> Option<Self> {
		const CANDIDATES: [&str; 7] = [
			"/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
			"/usr/share/fonts/TTF/DejaVuSans.ttf",
			"/usr/share/fonts/dejavu/DejaVuSans.ttf",
			"/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
			"/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
			"/System/Library/Fonts/Supplemental/Arial.ttf",
			"C:\\Windows\\Fonts\\arial.ttf",
		];
		CANDIDATES.iter().filter_map(|path| std::fs::read(path).ok()).find_map(|data| Self::from_data(data, size).ok())
	}

	pub(crate) fn usvg_options(&self) -> usvg::Options<'static> {
		let mut options = usvg::Options::default();
		options.font_family = self.family.clone();
		options.fontdb = Arc::clone(&self.fontdb);
		options
	}

	/// SVG `<text>` element whose first baseline starts at (`x`, `baseline`).
	pub(crate) fn text_element(&self, text: &str, x: f32, baseline: f32) -> String {
		let tspans: String = text
			.lines()
			.enumerate()
			.map(|(i, line)| {
				let dy = if i == 0 { "0".to_owned() } else { format!("{LINE_HEIGHT_EM}em") };
				format!(r#"<tspan x="{x}" dy="{dy}">{}</tspan>"#, escape_xml(line))
			})
			.collect();

		// Whitespace between tspans would be kept as text under `xml:space="preserve"`.
		format!(
			r#"<text x="{x}" y="{baseline}" font-family="{}" font-size="{}" fill="black" xml:space="preserve">{tspans}</text>"#,
			escape_xml(&self.family),
			self.size,
		)
	}
}

impl TextMeasurer for CaptionFont {
	/// Lays the text out exactly as the compositor will and reads back its ink box.
	fn measure(&self, text: &str) -> Result<TextMetrics, Error> {
		let baseline = self.size as f32;
		let svg = format!(
			r#"<svg width="1" height="1" xmlns="http://www.w3.org/2000/svg">
  {}
</svg>"#,
			self.text_element(text, 0.0, baseline)
		);
		let tree = usvg::Tree::from_str(&svg, &self.usvg_options()).map_err(|e| Error::Render(e.to_string()))?;

		let root = tree.root();
		if !root.has_children() {
			// Nothing with ink, e.g. empty or whitespace-only text.
			return Ok(TextMetrics::default());
		}
		let bbox = root.abs_bounding_box();
		if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
			return Ok(TextMetrics::default());
		}
		let metrics = TextMetrics {
			extent: Size::new(bbox.right().max(0.0).ceil() as u32, bbox.height().ceil() as u32),
			ascent: baseline - bbox.top(),
		};
		debug!(?metrics, "measured {text:?}");
		Ok(metrics)
	}
}

pub(crate) fn escape_xml(s: &str) -> String {
	s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;").replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn heuristic_width_follows_longest_line() {
		let m = HeuristicMeasurer { font_size: 50 }.measure("abcd\nab").unwrap();
		assert_eq!(m.extent, Size::new(120, 110));
	}

	#[test]
	fn heuristic_single_line_is_one_em_tall() {
		let m = HeuristicMeasurer { font_size: 50 }.measure("hello").unwrap();
		assert_eq!(m.extent, Size::new(150, 50));
		assert_eq!(m.ascent, 40.0);
	}

	#[test]
	fn heuristic_empty_text_has_no_extent() {
		let m = HeuristicMeasurer { font_size: 50 }.measure("").unwrap();
		assert_eq!(m.extent, Size::new(0, 0));
	}

	#[test]
	fn missing_font_file_is_a_font_load_error() {
		let err = CaptionFont::load(Path::new("/definitely/not/here/caption_font.otf"), 50).unwrap_err();
		assert!(matches!(err, Error::FontLoad(_)), "{err:?}");
	}

	#[test]
	fn garbage_font_data_is_a_font_load_error() {
		let err = CaptionFont::from_data(b"not a font at all".to_vec(), 50).unwrap_err();
		assert!(matches!(err, Error::FontLoad(_)), "{err:?}");
	}

	#[test]
	fn text_element_escapes_markup_and_stacks_lines() {
		let font = CaptionFont::blank(50);
		let element = font.text_element("a<b\nc&d", 10.0, 60.0);
		assert!(element.contains(r#"<tspan x="10" dy="0">a&lt;b</tspan>"#), "{element}");
		assert!(element.contains(r#"<tspan x="10" dy="1.2em">c&amp;d</tspan>"#), "{element}");
		assert!(element.contains(r#"y="60""#), "{element}");
	}

	#[test]
	fn real_face_measures_ink() {
		let Some(font) = CaptionFont::system(50) else {
			eprintln!("no system font found, skipping");
			return;
		};
		let hello = font.measure("Hello").unwrap();
		assert!(hello.extent.width > 0 && hello.extent.height > 0, "{hello:?}");
		assert!(hello.ascent > 0.0 && hello.ascent <= hello.extent.height as f32, "{hello:?}");

		let longer = font.measure("Hello Hello").unwrap();
		assert!(longer.extent.width > hello.extent.width, "{longer:?} vs {hello:?}");
		let stacked = font.measure("Hello\nHello").unwrap();
		assert!(stacked.extent.height > hello.extent.height, "{stacked:?} vs {hello:?}");
	}

	#[test]
	fn text_without_a_face_measures_empty() {
		let m = CaptionFont::blank(50).measure("no glyphs available").unwrap();
		assert_eq!(m.extent, Size::new(0, 0));
	}
}
