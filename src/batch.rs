
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use toml::{Table, Value};
use tracing::{debug, info, warn};

use crate::error::GenError;
use crate::generator::Generator;
use crate::modes::Registry;


/// What to do when an output file from an earlier run is already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnExisting {
	/// stop the whole batch
	#[default]
	Fail,
	/// log a warning, leave the file alone, and move on to the next one
	Skip
}

impl OnExisting {

	pub fn parse(value: impl AsRef<str>) -> Result<Self> {
		match value.as_ref() {
			"fail" => Ok(Self::Fail),
			"skip" => Ok(Self::Skip),
			other => bail!("Unrecognized on_existing policy: {}, try one of: fail, skip", other)
		}
	}
}


/// Everything a batch run needs, apart from the color modes themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
	pub mode: String,
	pub width: u32,
	pub height: u32,
	pub uncompressed: bool,
	pub out_dir: PathBuf,
	pub count: u32,
	pub prefix: String,
	pub start: u32,
	pub on_existing: OnExisting,
	pub seed: Option<u64>
}

impl Default for BatchConfig {

	fn default() -> Self {
		Self {
			mode: "RGB".to_string(),
			width: 1920,
			height: 1080,
			uncompressed: true,
			out_dir: PathBuf::from("out"),
			count: 3600,
			prefix: "test-".to_string(),
			start: 0,
			on_existing: OnExisting::Fail,
			seed: None
		}
	}
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchReport {
	pub written: u32,
	pub skipped: u32
}


impl BatchConfig {

	/// Reads a batch config file. Any key missing from the [batch] section keeps its default value.
	pub fn read(path: impl AsRef<Path>) -> Result<Self> {

		let path = path.as_ref();
		let toml = fs::read_to_string(path)
			.with_context(|| format!("Failed to read batch config file at: {}", path.to_string_lossy()))?;

		Self::from_toml(&toml)
			.with_context(|| format!("Failed to parse batch config file at: {}", path.to_string_lossy()))
	}

	pub fn from_toml(toml: impl AsRef<str>) -> Result<Self> {

		let toml = toml.as_ref()
			.parse::<Table>()
			.context("Batch config is not valid TOML")?;

		let mut config = Self::default();

		let Some(batch) = toml.get("batch")
			else { return Ok(config); };
		let batch = batch.as_table()
			.context("batch key is not a table")?;

		for (key, value) in batch {
			match key.as_str() {
				"mode" => config.mode = as_str(key, value)?.to_string(),
				"width" => config.width = as_u32(key, value)?,
				"height" => config.height = as_u32(key, value)?,
				"uncompressed" => config.uncompressed = value.as_bool()
					.with_context(|| format!("batch.{} was not a boolean", key))?,
				"out_dir" => config.out_dir = PathBuf::from(as_str(key, value)?),
				"count" => config.count = as_u32(key, value)?,
				"prefix" => config.prefix = as_str(key, value)?.to_string(),
				"start" => config.start = as_u32(key, value)?,
				"on_existing" => config.on_existing = OnExisting::parse(as_str(key, value)?)?,
				"seed" => {
					let seed = value.as_integer()
						.with_context(|| format!("batch.{} was not an integer", key))?;
					config.seed = Some(u64::try_from(seed)
						.with_context(|| format!("batch.{} must not be negative: {}", key, seed))?);
				}
				_ => bail!("Unrecognized key: batch.{}", key)
			}
		}

		Ok(config)
	}

	/// the path, without extension, of the i-th image
	pub fn base_name(&self, i: u32) -> PathBuf {
		self.out_dir.join(format!("{}{}", self.prefix, i))
	}

	/// Generates `count` images into `out_dir`, creating the folder if needed.
	/// Stops at the first error, unless the error is an existing file and the policy says to skip it.
	#[tracing::instrument(skip_all, level = 5, name = "Batch", fields(mode = %self.mode))]
	pub fn run(&self, registry: &Registry) -> Result<BatchReport> {

		let mut generator = Generator::new(registry, &self.mode, self.width, self.height, self.uncompressed)
			.context("Failed to configure the image generator")?;
		if let Some(seed) = self.seed {
			generator = generator.with_seed(seed);
		}

		self.prepare_out_dir()?;

		info!("Generating {} {}x{} {} images into: {}",
			self.count,
			self.width,
			self.height,
			generator.extension(),
			self.out_dir.to_string_lossy()
		);

		let mut report = BatchReport::default();
		let end = self.start.checked_add(self.count)
			.context("Image numbers don't fit in 32 bits, try a smaller start or count")?;

		for i in self.start .. end {
			match generator.generate(self.base_name(i)) {

				Ok(path) => {
					report.written += 1;
					debug!("Wrote image {}/{}: {}", i - self.start + 1, self.count, path.to_string_lossy());
				}

				Err(GenError::FileAlreadyExists { path }) if self.on_existing == OnExisting::Skip => {
					report.skipped += 1;
					warn!("Skipping image, file already exists: {}", path.to_string_lossy());
				}

				Err(e) => {
					return Err(e)
						.context(format!("Failed to generate image {} after writing {}", i, report.written));
				}
			}
		}

		info!("Finished: wrote {} images, skipped {}", report.written, report.skipped);

		Ok(report)
	}

	fn prepare_out_dir(&self) -> Result<()> {

		let dir = &self.out_dir;
		let dir_exists = dir.try_exists()
			.context(format!("Failed to check output folder: {}", dir.to_string_lossy()))?;
		if dir_exists {
			let metadata = fs::metadata(dir)
				.context(format!("Failed to get metadata for output folder: {}", dir.to_string_lossy()))?;
			if !metadata.is_dir() {
				bail!("Output folder path exists, but is not a folder: {}", dir.to_string_lossy());
			}
		} else {
			fs::create_dir_all(dir)
				.context(format!("Failed to create output folder: {}", dir.to_string_lossy()))?;
			info!("Created output folder: {}", dir.to_string_lossy());
		}

		Ok(())
	}
}


fn as_str<'v>(key: &str, value: &'v Value) -> Result<&'v str> {
	value.as_str()
		.with_context(|| format!("batch.{} was not a string", key))
}


fn as_u32(key: &str, value: &Value) -> Result<u32> {
	let i = value.as_integer()
		.with_context(|| format!("batch.{} was not an integer", key))?;
	u32::try_from(i)
		.with_context(|| format!("batch.{} is out of range: {}", key, i))
}
