
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use gumdrop::Options;
use tracing::info;

use random_image::batch::{BatchConfig, OnExisting};
use random_image::logging::{self, ResultExt};
use random_image::modes::Registry;


#[derive(Options)]
struct Args {

	#[options(help_flag)]
	help: bool,

	/// settings for log output
	#[options(default_expr = "logging::DEFAULT_FILTER.to_string()")]
	log: String,

	/// path to the color mode configuration file
	#[options(no_short, default_expr = "PathBuf::from(Registry::DEFAULT_PATH)", parse(try_from_str))]
	modes_config: PathBuf,

	#[options(command)]
	cmd: Option<Command>
}

#[derive(Options)]
enum Command {

	/// Generate a batch of random images
	Generate(ArgsGenerate),

	/// List the supported color modes
	Modes(ArgsModes)
}


#[derive(Options)]
struct ArgsGenerate {

	/// batch config file (TOML), command line options override its values
	#[options(short = "c", parse(try_from_str))]
	config: Option<PathBuf>,

	/// color mode, see the modes command
	#[options(short = "m")]
	mode: Option<String>,

	/// image width in pixels
	#[options(short = "w")]
	width: Option<u32>,

	/// image height in pixels
	#[options(no_short)]
	height: Option<u32>,

	/// save as lossy jpeg
	#[options(no_short)]
	compressed: bool,

	/// save in the color mode's uncompressed format
	#[options(no_short)]
	uncompressed: bool,

	/// folder for the generated images
	#[options(short = "o", parse(try_from_str))]
	out: Option<PathBuf>,

	/// number of images to generate
	#[options(short = "n")]
	count: Option<u32>,

	/// file name prefix, followed by the image number
	#[options(short = "p")]
	prefix: Option<String>,

	/// number of the first image
	#[options(no_short)]
	start: Option<u32>,

	/// skip images whose files already exist, instead of stopping
	#[options(no_short)]
	skip_existing: bool,

	/// seed for the random number generator
	#[options(no_short)]
	seed: Option<u64>
}

impl ArgsGenerate {

	fn into_config(self) -> Result<BatchConfig> {

		let mut config = match &self.config {
			Some(path) => BatchConfig::read(path)?,
			None => BatchConfig::default()
		};

		if let Some(mode) = self.mode {
			config.mode = mode;
		}
		if let Some(width) = self.width {
			config.width = width;
		}
		if let Some(height) = self.height {
			config.height = height;
		}
		match (self.compressed, self.uncompressed) {
			(true, true) => bail!("Choose only one of --compressed or --uncompressed"),
			(true, false) => config.uncompressed = false,
			(false, true) => config.uncompressed = true,
			(false, false) => ()
		}
		if let Some(out) = self.out {
			config.out_dir = out;
		}
		if let Some(count) = self.count {
			config.count = count;
		}
		if let Some(prefix) = self.prefix {
			config.prefix = prefix;
		}
		if let Some(start) = self.start {
			config.start = start;
		}
		if self.skip_existing {
			config.on_existing = OnExisting::Skip;
		}
		if let Some(seed) = self.seed {
			config.seed = Some(seed);
		}

		Ok(config)
	}
}


#[derive(Options)]
struct ArgsModes {
	// no args needed
}


fn main() -> ExitCode {

	// parse arguments
	let args = Args::parse_args_default_or_exit();

	// init logging
	let Ok(_) = logging::init(&args.log)
		.log_err()
		else { return ExitCode::FAILURE; };

	let Ok(_) = run(args)
		.log_err()
		else { return ExitCode::FAILURE; };

	// we finished! =)
	ExitCode::SUCCESS
}


#[tracing::instrument(skip_all, level = 5, name = "RandomImage")]
fn run(args: Args) -> Result<()> {

	let registry = Registry::load(&args.modes_config)
		.context("Failed to load the color modes")?;

	match args.cmd {
		Some(Command::Generate(generate_args)) => generate(&registry, generate_args),
		Some(Command::Modes(..)) => modes(&registry),
		None => bail!("No command, try one of:\n{}", Args::command_list().unwrap_or_default())
	}
}


fn generate(registry: &Registry, args: ArgsGenerate) -> Result<()> {

	let config = args.into_config()?;
	let report = config.run(registry)?;

	info!("Wrote {} images into: {}", report.written, config.out_dir.to_string_lossy());

	Ok(())
}


fn modes(registry: &Registry) -> Result<()> {

	println!("{:<10} {:>8} {:>8}  {}", "mode", "bits", "channels", "uncompressed");
	for (name, entry) in registry.iter() {
		println!("{:<10} {:>8} {:>8}  {}",
			name,
			entry.max_bit,
			entry.number_of_bit,
			entry.uncompressed_image_format.as_deref()
				.unwrap_or("(none)")
		);
	}

	Ok(())
}
