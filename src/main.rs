use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::WrapErr as _};
use tracing::info;
use xsay::{
	compositor,
	config::AppConfig,
	geometry::{Direction, Point},
	text::{CaptionFont, HeuristicMeasurer},
};

#[derive(Debug, Parser)]
#[command(name = "xsay")]
#[command(about = "Put words in a picture's mouth")]
struct Args {
	/// Config file. Defaults to $XDG_CONFIG_HOME/xsay.{toml,json,yaml,...}
	#[arg(long, global = true)]
	config: Option<PathBuf>,
	#[arg(short, long, global = true)]
	verbose: bool,
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Draw a bubble with the given text onto an image
	Draw {
		image: PathBuf,
		text: String,
		x: i32,
		y: i32,
		/// right, left or any
		#[arg(long, default_value_t = Direction::Any)]
		direction: Direction,
		/// Caption font; overrides the configured one
		#[arg(long)]
		font: Option<PathBuf>,
		/// Print the bubble layout from a monospace estimate of the text instead of drawing; needs no font
		#[arg(long)]
		dry_run: bool,
		#[arg(short, long, default_value = "xsay.png")]
		output: PathBuf,
	},
	/// Draw a random configured phrase onto a random configured template
	Random {
		#[arg(short, long, default_value = "xsay.png")]
		output: PathBuf,
	},
}

fn main() -> Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	xsay::logging::init(args.verbose);

	let config = AppConfig::load(args.config.as_deref())?;
	let mut rng = rand::rng();

	let (png, output) = match args.command {
		Command::Draw {
			image,
			text,
			x,
			y,
			direction,
			font,
			dry_run,
			output,
		} => {
			let anchor = Point::new(x, y);
			if dry_run {
				let source = xsay::open_image(&image)?;
				let facing = direction.resolve(&mut rng);
				let measurer = HeuristicMeasurer { font_size: config.style.font_size };
				let (layout, metrics) = compositor::plan_bubble(&source, &text, anchor, facing, &measurer, &config.style)?;
				println!("Facing: {facing:?}");
				println!("Estimated text: {}x{}", metrics.extent.width, metrics.extent.height);
				println!("{:#?}", layout);
				return Ok(());
			}
			let font = match font {
				Some(path) => CaptionFont::load(&path, config.style.font_size)?,
				None => config.caption_font()?,
			};
			let png = xsay::generate(&image, &text, anchor, direction, &font, &config.style, &mut rng)?;
			(png, output)
		}
		Command::Random { output } => {
			let gallery = config.gallery()?;
			let font = config.caption_font()?;
			let png = gallery.generate(&font, &config.style, &mut rng)?;
			(png, output)
		}
	};

	std::fs::write(&output, png).wrap_err_with(|| format!("Failed to write {}", output.display()))?;
	info!("Wrote {}", output.display());

	Ok(())
}
