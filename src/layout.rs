//! Bubble geometry.
//!
//! Pure integer arithmetic: given how large the caption text is and where the tail should point,
//! work out the rectangle, the tail triangle, where the text starts, and how far the canvas has to
//! grow in each direction for all of it to fit. Everything returned is in canvas space.

use serde::Deserialize;
use tracing::debug;

use crate::{
	Error,
	geometry::{Facing, Point, Rect, Size},
};

/// Fixed measurements of a bubble, in pixels.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct BubbleStyle {
	/// Caption font size, used both to measure and to draw the text.
	pub font_size: u32,
	/// Gap between the text and the rectangle's left/right edges.
	pub padding_width: u32,
	/// Gap between the text and the rectangle's top/bottom edges.
	pub padding_height: u32,
	/// Horizontal distance from the anchor to where the tail meets the rectangle.
	pub tail_offset_x: u32,
	/// Half the height of the tail where it meets the rectangle.
	pub tail_offset_y: u32,
	pub corner_radius: u32,
}

impl Default for BubbleStyle {
	fn default() -> Self {
		Self {
			font_size: 50,
			padding_width: 5,
			padding_height: 5,
			tail_offset_x: 20,
			tail_offset_y: 20,
			corner_radius: 3,
		}
	}
}

/// The output surface: its size, and where the source image's top-left lands on it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Canvas {
	pub size: Size,
	pub origin_offset: Point,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BubbleGeometry {
	pub rectangle: Rect,
	/// Anchor first, then the upper and lower points where the tail meets the rectangle.
	pub triangle: [Point; 3],
	pub text_origin: Point,
}

impl BubbleGeometry {
	/// The tail's base, which the compositor paints over to merge it into the rectangle.
	pub fn tail_base(&self) -> (Point, Point) {
		(self.triangle[1], self.triangle[2])
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BubbleLayout {
	pub canvas: Canvas,
	pub geometry: BubbleGeometry,
}

/// Lay out a bubble whose text measures `text_extent`, with its tail touching `anchor`.
///
/// `anchor` is given in source-image coordinates.
///
/// Fails with [`Error::InvalidGeometryInput`] when the source has a zero dimension, or when `anchor`
/// lies outside `[0, width] x [0, height]`. Both are caller bugs; inside those bounds every returned
/// coordinate is on the canvas.
pub fn compute_layout(source: Size, anchor: Point, facing: Facing, text_extent: Size, style: &BubbleStyle) -> Result<BubbleLayout, Error> {
	if source.width == 0 || source.height == 0 {
		return Err(Error::InvalidGeometryInput(format!("source image must have positive dimensions, got {}x{}", source.width, source.height)));
	}
	let source_width = source.width as i32;
	let source_height = source.height as i32;
	if !(0..=source_width).contains(&anchor.x) || !(0..=source_height).contains(&anchor.y) {
		return Err(Error::InvalidGeometryInput(format!(
			"anchor ({}, {}) lies outside the {}x{} source image",
			anchor.x, anchor.y, source.width, source.height
		)));
	}

	let sign = facing.sign();
	let tail_x = style.tail_offset_x as i32;
	let tail_y = style.tail_offset_y as i32;
	let padded_width = (text_extent.width + style.padding_width * 2) as i32;
	let padded_height = (text_extent.height + style.padding_height * 2) as i32;

	let crossover = anchor.x + sign * tail_x;
	let far_edge = crossover + sign * padded_width;

	// Floor division: an odd padded height loses its last pixel row.
	let half_height = padded_height / 2;
	let min_y = anchor.y - half_height;
	let max_y = anchor.y + half_height;
	let span_top = min_y.min(anchor.y - tail_y);
	let span_bottom = max_y.max(anchor.y + tail_y);

	// Only one of these can apply: the bubble extends from the anchor in a single direction.
	let canvas_width = if far_edge > source_width {
		far_edge
	} else if far_edge < 0 {
		source_width - far_edge
	} else {
		source_width
	};
	let canvas_height = span_bottom.max(source_height) - span_top.min(0);

	let origin_offset = Point::new(if far_edge < 0 { -far_edge } else { 0 }, if span_top < 0 { -span_top } else { 0 });
	debug!(
		canvas_width,
		canvas_height,
		offset_x = origin_offset.x,
		offset_y = origin_offset.y,
		"bubble needs {}x{} canvas for {}x{} source",
		canvas_width,
		canvas_height,
		source.width,
		source.height
	);

	let anchor = anchor.translate(origin_offset);
	let crossover = crossover + origin_offset.x;
	let min_y = min_y + origin_offset.y;
	let max_y = max_y + origin_offset.y;

	let (left, right) = match facing {
		Facing::Right => {
			let left = anchor.x + tail_x;
			(left, left + padded_width)
		}
		Facing::Left => {
			let right = anchor.x - tail_x;
			(right - padded_width, right)
		}
	};
	let rectangle = Rect::new(left, min_y, right, max_y);

	let triangle = [anchor, Point::new(crossover, anchor.y - tail_y), Point::new(crossover, anchor.y + tail_y)];
	let text_origin = rectangle.top_left().translate(Point::new(style.padding_width as i32, style.padding_height as i32));

	Ok(BubbleLayout {
		canvas: Canvas {
			size: Size::new(canvas_width as u32, canvas_height as u32),
			origin_offset,
		},
		geometry: BubbleGeometry { rectangle, triangle, text_origin },
	})
}
