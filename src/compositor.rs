use image::{DynamicImage, GenericImageView, RgbaImage, imageops};
use tracing::debug;

use crate::{
	Error,
	geometry::{Facing, Point, Size},
	layout::{BubbleLayout, BubbleStyle, compute_layout},
	text::{CaptionFont, TextMeasurer, TextMetrics},
};

/// Measure `text` and lay out its bubble over `source`, without drawing anything.
pub fn plan_bubble<M: TextMeasurer + ?Sized>(source: &DynamicImage, text: &str, anchor: Point, facing: Facing, measurer: &M, style: &BubbleStyle) -> Result<(BubbleLayout, TextMetrics), Error> {
	let metrics = measurer.measure(text)?;
	let (width, height) = source.dimensions();
	let layout = compute_layout(Size::new(width, height), anchor, facing, metrics.extent, style)?;
	Ok((layout, metrics))
}

/// Measure, lay out and draw a bubble around `text` onto a copy of `source`.
pub fn draw_text_bubble(source: &DynamicImage, text: &str, anchor: Point, facing: Facing, font: &CaptionFont, style: &BubbleStyle) -> Result<RgbaImage, Error> {
	let (layout, metrics) = plan_bubble(source, text, anchor, facing, font, style)?;
	render(source, &layout, text, &metrics, font, style)
}

/// Paint the laid-out bubble over a copy of `source` placed on the (possibly larger) canvas.
pub fn render(source: &DynamicImage, layout: &BubbleLayout, text: &str, metrics: &TextMetrics, font: &CaptionFont, style: &BubbleStyle) -> Result<RgbaImage, Error> {
	let Size { width, height } = layout.canvas.size;
	let offset = layout.canvas.origin_offset;

	let mut canvas = RgbaImage::new(width, height);
	imageops::replace(&mut canvas, &source.to_rgba8(), offset.x as i64, offset.y as i64);

	let svg_content = generate_bubble_svg(layout, text, metrics, font, style);
	let tree = usvg::Tree::from_str(&svg_content, &font.usvg_options()).map_err(|e| Error::Render(e.to_string()))?;

	// Render the bubble to a transparent pixmap
	let mut bubble_pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| Error::Render(format!("Failed to create {width}x{height} pixmap")))?;
	resvg::render(&tree, tiny_skia::Transform::default(), &mut bubble_pixmap.as_mut());

	// Composite bubble layer onto the canvas
	for y in 0..height {
		for x in 0..width {
			let Some(bubble_pixel) = bubble_pixmap.pixel(x, y) else { continue };
			if bubble_pixel.alpha() == 0 {
				continue;
			}
			blend_over(canvas.get_pixel_mut(x, y), bubble_pixel.demultiply());
		}
	}
	debug!(width, height, offset_x = offset.x, offset_y = offset.y, "composited bubble");

	Ok(canvas)
}

/// Porter-Duff "source over" in straight alpha.
fn blend_over(dst: &mut image::Rgba<u8>, src: tiny_skia::ColorU8) {
	let src_a = src.alpha() as f32 / 255.0;
	let dst_a = dst[3] as f32 / 255.0;
	let out_a = src_a + dst_a * (1.0 - src_a);
	if out_a <= 0.0 {
		return;
	}
	let mix = |s: u8, d: u8| ((s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a).round() as u8;
	dst[0] = mix(src.red(), dst[0]);
	dst[1] = mix(src.green(), dst[1]);
	dst[2] = mix(src.blue(), dst[2]);
	dst[3] = (out_a * 255.0).round() as u8;
}

/// Strokes are 1px wide and centred on pixel centres, so the outline covers exactly the pixels
/// at the integer corners.
fn generate_bubble_svg(layout: &BubbleLayout, text: &str, metrics: &TextMetrics, font: &CaptionFont, style: &BubbleStyle) -> String {
	let Size { width, height } = layout.canvas.size;
	let g = &layout.geometry;
	let px = |v: i32| v as f32 + 0.5;

	let rect = g.rectangle;
	let (upper, lower) = g.tail_base();
	let polygon = g.triangle.iter().map(|p| format!("{},{}", px(p.x), px(p.y))).collect::<Vec<_>>().join(" ");
	let text_element = font.text_element(text, g.text_origin.x as f32, g.text_origin.y as f32 + metrics.ascent);

	format!(
		r#"<?xml version="1.0" encoding="UTF-8"?>
<svg width="{width}" height="{height}" xmlns="http://www.w3.org/2000/svg">
  <rect x="{}" y="{}" width="{}" height="{}" rx="{radius}" ry="{radius}" fill="white" stroke="black" stroke-width="1" shape-rendering="crispEdges"/>
  {text_element}
  <polygon points="{polygon}" fill="white" stroke="black" stroke-width="1" shape-rendering="crispEdges"/>
  <line x1="{}" y1="{}" x2="{}" y2="{}" stroke="white" stroke-width="1" shape-rendering="crispEdges"/>
</svg>"#,
		px(rect.left),
		px(rect.top),
		rect.width(),
		rect.height(),
		px(upper.x),
		px(upper.y),
		px(lower.x),
		px(lower.y),
		radius = style.corner_radius,
	)
}

#[cfg(test)]
mod tests {
	use image::Rgba;

	use super::*;

	const RED: Rgba<u8> = Rgba([200, 30, 30, 255]);
	const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
	const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

	fn red_source(width: u32, height: u32) -> DynamicImage {
		DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, RED))
	}

	fn bubble(source: &DynamicImage, anchor: (i32, i32), facing: Facing, extent: (u32, u32)) -> RgbaImage {
		let style = BubbleStyle::default();
		let metrics = TextMetrics {
			extent: Size::new(extent.0, extent.1),
			ascent: 0.0,
		};
		let (w, h) = source.dimensions();
		let layout = compute_layout(Size::new(w, h), Point::new(anchor.0, anchor.1), facing, metrics.extent, &style).unwrap();
		render(source, &layout, "", &metrics, &CaptionFont::blank(style.font_size), &style).unwrap()
	}

	#[test]
	fn output_takes_the_canvas_size() {
		let out = bubble(&red_source(100, 100), (90, 50), Facing::Right, (50, 20));
		assert_eq!(out.dimensions(), (170, 100));
	}

	#[test]
	fn growth_area_stays_transparent() {
		let out = bubble(&red_source(100, 100), (90, 50), Facing::Right, (50, 20));
		assert_eq!(out.get_pixel(150, 5)[3], 0);
		assert_eq!(out.get_pixel(150, 95)[3], 0);
	}

	#[test]
	fn source_is_copied_at_the_origin_offset() {
		let out = bubble(&red_source(100, 100), (5, 50), Facing::Left, (50, 20));
		assert_eq!(out.dimensions(), (175, 100));
		// source occupies x in [75, 175)
		assert_eq!(*out.get_pixel(75, 0), RED);
		assert_eq!(*out.get_pixel(174, 99), RED);
		assert_eq!(out.get_pixel(74, 0)[3], 0);
	}

	#[test]
	fn rectangle_is_white_with_a_black_outline() {
		// rectangle spans x [110, 170], y [35, 65]
		let out = bubble(&red_source(100, 100), (90, 50), Facing::Right, (50, 20));
		assert_eq!(*out.get_pixel(140, 35), BLACK);
		assert_eq!(*out.get_pixel(140, 65), BLACK);
		assert_eq!(*out.get_pixel(140, 50), WHITE);
		assert_eq!(out.get_pixel(140, 33)[3], 0);
	}

	#[test]
	fn tail_is_filled_and_merged_into_the_rectangle() {
		let out = bubble(&red_source(200, 200), (50, 100), Facing::Right, (50, 60));
		// rectangle x [70, 130], y [65, 135]; tail meets it along x = 70, y [80, 120]
		assert_eq!(*out.get_pixel(65, 100), WHITE);
		assert_eq!(*out.get_pixel(70, 100), WHITE);
		assert_eq!(*out.get_pixel(70, 70), BLACK);
		assert_eq!(*out.get_pixel(45, 100), RED);
	}

	#[test]
	fn caller_image_is_left_untouched() {
		let source = red_source(100, 100);
		let before = source.to_rgba8();
		let _ = bubble(&source, (50, 50), Facing::Right, (30, 10));
		assert_eq!(source.to_rgba8(), before);
	}

	#[test]
	fn text_is_drawn_black_inside_its_measured_box() {
		let Some(font) = CaptionFont::system(50) else {
			eprintln!("no system font found, skipping");
			return;
		};
		let style = BubbleStyle::default();
		let source = red_source(400, 300);
		let (layout, metrics) = plan_bubble(&source, "Hello", Point::new(100, 150), Facing::Right, &font, &style).unwrap();
		assert!(metrics.extent.width > 0 && metrics.extent.height > 0, "{metrics:?}");

		let out = render(&source, &layout, "Hello", &metrics, &font, &style).unwrap();
		let rect = layout.geometry.rectangle;
		let origin = layout.geometry.text_origin;
		let (text_right, text_bottom) = (origin.x + metrics.extent.width as i32, origin.y + metrics.extent.height as i32);
		assert!(origin.x > rect.left && origin.y > rect.top && text_right < rect.right && text_bottom <= rect.bottom, "{metrics:?} in {rect:?}");

		// Inside the outline and clear of the rounded corners, anything grey is ink, and ink stays in its box (1px for antialiasing).
		let inset = style.corner_radius as i32 + 1;
		let mut ink = 0;
		for y in rect.top + inset..=rect.bottom - inset {
			for x in rect.left + inset..=rect.right - inset {
				let p = out.get_pixel(x as u32, y as u32);
				if p[0] < 200 && p[0] == p[1] && p[1] == p[2] {
					ink += 1;
					assert!(
						(origin.x - 1..=text_right + 1).contains(&x) && (origin.y - 1..=text_bottom + 1).contains(&y),
						"ink at ({x}, {y}) outside text box {origin:?}..({text_right}, {text_bottom})"
					);
				}
			}
		}
		assert!(ink > 0, "no text pixels were drawn");
	}

	#[test]
	fn heuristic_plan_matches_the_layout_engine() {
		let style = BubbleStyle::default();
		let measurer = crate::text::HeuristicMeasurer { font_size: style.font_size };
		let (layout, metrics) = plan_bubble(&red_source(100, 100), "hi", Point::new(90, 50), Facing::Right, &measurer, &style).unwrap();
		// 2 chars at 30px each; far edge at 90 + 20 + 60 + 10
		assert_eq!(metrics.extent, Size::new(60, 50));
		assert_eq!(layout.canvas.size, Size::new(180, 100));
	}

	#[test]
	fn blend_over_transparent_takes_the_source_colour() {
		let mut dst = Rgba([0, 0, 0, 0]);
		blend_over(&mut dst, tiny_skia::ColorU8::from_rgba(255, 255, 255, 255));
		assert_eq!(dst, WHITE);
	}

	#[test]
	fn blend_half_white_over_black() {
		let mut dst = BLACK;
		blend_over(&mut dst, tiny_skia::ColorU8::from_rgba(255, 255, 255, 128));
		assert_eq!(dst, Rgba([128, 128, 128, 255]));
	}

	#[test]
	fn svg_places_the_rectangle_on_pixel_centres() {
		let style = BubbleStyle::default();
		let layout = compute_layout(Size::new(100, 100), Point::new(90, 50), Facing::Right, Size::new(50, 20), &style).unwrap();
		let svg = generate_bubble_svg(&layout, "", &TextMetrics::default(), &CaptionFont::blank(50), &style);
		assert!(svg.contains(r#"<rect x="110.5" y="35.5" width="60" height="30" rx="3" ry="3""#), "{svg}");
		assert!(svg.contains(r#"<polygon points="90.5,50.5 110.5,30.5 110.5,70.5""#), "{svg}");
		assert!(svg.contains(r#"<line x1="110.5" y1="30.5" x2="110.5" y2="70.5" stroke="white""#), "{svg}");
	}
}
