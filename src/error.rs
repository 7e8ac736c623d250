use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	/// Caller handed the layout engine something it cannot place. Programming error, not user input.
	#[error("Invalid geometry input: {0}")]
	InvalidGeometryInput(String),
	#[error("Failed to decode image {}: {source}", .path.display())]
	ImageDecode {
		path: PathBuf,
		#[source]
		source: image::ImageError,
	},
	#[error("Failed to load caption font: {0}")]
	FontLoad(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfiguration(String),
	#[error("Render error: {0}")]
	Render(String),
	#[error("Failed to encode image: {0}")]
	Encode(#[source] image::ImageError),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}
