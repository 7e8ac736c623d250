pub mod compositor;
pub mod config;
pub mod error;
pub mod gallery;
pub mod geometry;
pub mod layout;
pub mod logging;
pub mod text;

use std::{io::Cursor, path::Path};

pub use error::Error;
use image::{DynamicImage, ImageFormat, RgbaImage};
use rand::Rng;
use tracing::info;

use crate::{
	geometry::{Direction, Point},
	layout::BubbleStyle,
	text::CaptionFont,
};

pub fn open_image(path: &Path) -> Result<DynamicImage, Error> {
	image::open(path).map_err(|source| Error::ImageDecode { path: path.to_path_buf(), source })
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, Error> {
	let mut bytes = Vec::new();
	image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).map_err(Error::Encode)?;
	Ok(bytes)
}

/// Draw `phrase` in a bubble pointing at `anchor` on the template at `template_path`, returning PNG bytes.
///
/// `Direction::Any` is settled here, once, from `rng`.
pub fn generate<R: Rng + ?Sized>(template_path: &Path, phrase: &str, anchor: Point, direction: Direction, font: &CaptionFont, style: &BubbleStyle, rng: &mut R) -> Result<Vec<u8>, Error> {
	let source = open_image(template_path)?;
	let facing = direction.resolve(rng);
	info!(template = %template_path.display(), ?facing, "drawing {phrase:?}");
	let image = compositor::draw_text_bubble(&source, phrase, anchor, facing, font, style)?;
	encode_png(&image)
}
