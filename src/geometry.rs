use std::{fmt, str::FromStr};

use derive_new::new;
use rand::Rng;

use crate::Error;

/// Pixel coordinate. Origin is top-left, `y` grows downward.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, new)]
pub struct Point {
	pub x: i32,
	pub y: i32,
}

impl Point {
	pub fn translate(self, by: Point) -> Self {
		Self::new(self.x + by.x, self.y + by.y)
	}
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, new)]
pub struct Size {
	pub width: u32,
	pub height: u32,
}

/// Inclusive pixel corners.
#[derive(Clone, Copy, Debug, Eq, PartialEq, new)]
pub struct Rect {
	pub left: i32,
	pub top: i32,
	pub right: i32,
	pub bottom: i32,
}

impl Rect {
	pub fn top_left(&self) -> Point {
		Point::new(self.left, self.top)
	}

	pub fn width(&self) -> i32 {
		self.right - self.left
	}

	pub fn height(&self) -> i32 {
		self.bottom - self.top
	}
}

/// Which side of the anchor the bubble's rectangle sits on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Facing {
	Right,
	Left,
}

impl Facing {
	pub fn sign(self) -> i32 {
		match self {
			Facing::Right => 1,
			Facing::Left => -1,
		}
	}
}

/// Direction preference as written in template records. `Any` is a policy, resolved per call.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
	Right,
	Left,
	#[default]
	Any,
}

impl Direction {
	pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> Facing {
		match self {
			Direction::Right => Facing::Right,
			Direction::Left => Facing::Left,
			Direction::Any =>
				if rng.random_bool(0.5) {
					Facing::Right
				} else {
					Facing::Left
				},
		}
	}
}

impl FromStr for Direction {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"right" => Ok(Direction::Right),
			"left" => Ok(Direction::Left),
			"any" => Ok(Direction::Any),
			other => Err(Error::InvalidConfiguration(format!("unknown direction {other:?}, expected one of \"right\", \"left\", \"any\""))),
		}
	}
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Direction::Right => "right",
			Direction::Left => "left",
			Direction::Any => "any",
		};
		f.write_str(s)
	}
}
