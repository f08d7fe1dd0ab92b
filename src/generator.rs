
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Seek, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use fastrand::Rng;
use image::{ColorType, DynamicImage, GrayAlphaImage, GrayImage, ImageBuffer, ImageFormat, ImageResult, Luma, LumaA, Pixel, Rgb, RgbImage, Rgba, RgbaImage};
use tracing::{debug, trace};

use crate::error::GenError;
use crate::logging::ResultExt;
use crate::modes::{ModeEntry, Registry};


/// file extension used when compressed output is requested
pub const COMPRESSED_FORMAT: &str = "jpeg";


/// The in-memory sample layout for a color mode.
///
/// Channel count comes from `number_of_bit`.
/// Depths up to 8 bits are stored in `u8` samples, depths up to 16 bits in `u16` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
	L8,
	La8,
	Rgb8,
	Rgba8,
	L16,
	La16,
	Rgb16,
	Rgba16
}

impl PixelLayout {

	pub fn resolve(entry: &ModeEntry) -> Option<Self> {

		let wide = match entry.max_bit {
			1 ..= 8 => false,
			9 ..= 16 => true,
			_ => return None
		};

		let layout = match (entry.number_of_bit, wide) {
			(1, false) => Self::L8,
			(2, false) => Self::La8,
			(3, false) => Self::Rgb8,
			(4, false) => Self::Rgba8,
			(1, true) => Self::L16,
			(2, true) => Self::La16,
			(3, true) => Self::Rgb16,
			(4, true) => Self::Rgba16,
			_ => return None
		};

		Some(layout)
	}

	pub fn color_type(self) -> ColorType {
		match self {
			Self::L8 => ColorType::L8,
			Self::La8 => ColorType::La8,
			Self::Rgb8 => ColorType::Rgb8,
			Self::Rgba8 => ColorType::Rgba8,
			Self::L16 => ColorType::L16,
			Self::La16 => ColorType::La16,
			Self::Rgb16 => ColorType::Rgb16,
			Self::Rgba16 => ColorType::Rgba16
		}
	}

	/// Bytes needed for a width x height buffer, or None if no Vec could ever be that long.
	pub fn buffer_len(self, width: u32, height: u32) -> Option<usize> {
		let color_type = self.color_type();
		(width as usize)
			.checked_mul(height as usize)?
			.checked_mul(color_type.channel_count() as usize)?
			.checked_mul((color_type.bytes_per_pixel()/color_type.channel_count()) as usize)
			.filter(|&len| len <= isize::MAX as usize)
	}
}


type Gray16Image = ImageBuffer<Luma<u16>,Vec<u16>>;
type GrayAlpha16Image = ImageBuffer<LumaA<u16>,Vec<u16>>;
type Rgb16Image = ImageBuffer<Rgb<u16>,Vec<u16>>;
type Rgba16Image = ImageBuffer<Rgba<u16>,Vec<u16>>;


/// the pixel buffer that gets overwritten by every generate call
enum Scratch {
	L8(GrayImage),
	La8(GrayAlphaImage),
	Rgb8(RgbImage),
	Rgba8(RgbaImage),
	L16(Gray16Image),
	La16(GrayAlpha16Image),
	Rgb16(Rgb16Image),
	Rgba16(Rgba16Image)
}

impl Scratch {

	fn new(layout: PixelLayout, width: u32, height: u32) -> Self {
		match layout {
			PixelLayout::L8 => Self::L8(ImageBuffer::new(width, height)),
			PixelLayout::La8 => Self::La8(ImageBuffer::new(width, height)),
			PixelLayout::Rgb8 => Self::Rgb8(ImageBuffer::new(width, height)),
			PixelLayout::Rgba8 => Self::Rgba8(ImageBuffer::new(width, height)),
			PixelLayout::L16 => Self::L16(ImageBuffer::new(width, height)),
			PixelLayout::La16 => Self::La16(ImageBuffer::new(width, height)),
			PixelLayout::Rgb16 => Self::Rgb16(ImageBuffer::new(width, height)),
			PixelLayout::Rgba16 => Self::Rgba16(ImageBuffer::new(width, height))
		}
	}

	/// overwrites every channel of every pixel with a uniform draw from 0 ..= max
	fn fill(&mut self, rng: &mut Rng, max: u16) {

		// 8-bit layouts only come from depths of 8 bits or less
		let max8 = u8::try_from(max)
			.unwrap_or(u8::MAX);

		match self {
			Self::L8(buf) => fill_buffer(buf, || rng.u8(0 ..= max8)),
			Self::La8(buf) => fill_buffer(buf, || rng.u8(0 ..= max8)),
			Self::Rgb8(buf) => fill_buffer(buf, || rng.u8(0 ..= max8)),
			Self::Rgba8(buf) => fill_buffer(buf, || rng.u8(0 ..= max8)),
			Self::L16(buf) => fill_buffer(buf, || rng.u16(0 ..= max)),
			Self::La16(buf) => fill_buffer(buf, || rng.u16(0 ..= max)),
			Self::Rgb16(buf) => fill_buffer(buf, || rng.u16(0 ..= max)),
			Self::Rgba16(buf) => fill_buffer(buf, || rng.u16(0 ..= max))
		}
	}

	fn write_to<W:Write + Seek>(&self, writer: &mut W, format: ImageFormat) -> ImageResult<()> {
		match self {
			Self::L8(buf) => buf.write_to(writer, format),
			Self::La8(buf) => buf.write_to(writer, format),
			Self::Rgb8(buf) => buf.write_to(writer, format),
			Self::Rgba8(buf) => buf.write_to(writer, format),
			Self::L16(buf) => buf.write_to(writer, format),
			Self::La16(buf) => buf.write_to(writer, format),
			Self::Rgb16(buf) => buf.write_to(writer, format),
			Self::Rgba16(buf) => buf.write_to(writer, format)
		}
	}

	fn to_dynamic(&self) -> DynamicImage {
		match self {
			Self::L8(buf) => DynamicImage::ImageLuma8(buf.clone()),
			Self::La8(buf) => DynamicImage::ImageLumaA8(buf.clone()),
			Self::Rgb8(buf) => DynamicImage::ImageRgb8(buf.clone()),
			Self::Rgba8(buf) => DynamicImage::ImageRgba8(buf.clone()),
			Self::L16(buf) => DynamicImage::ImageLuma16(buf.clone()),
			Self::La16(buf) => DynamicImage::ImageLumaA16(buf.clone()),
			Self::Rgb16(buf) => DynamicImage::ImageRgb16(buf.clone()),
			Self::Rgba16(buf) => DynamicImage::ImageRgba16(buf.clone())
		}
	}
}


fn fill_buffer<P:Pixel>(buf: &mut ImageBuffer<P,Vec<P::Subpixel>>, mut sample: impl FnMut() -> P::Subpixel) {
	// pixels_mut() walks rows top to bottom, and each row left to right
	for pixel in buf.pixels_mut() {
		for channel in pixel.channels_mut() {
			*channel = sample();
		}
	}
}


/// Writes images of uniformly random pixels for one color mode and size.
///
/// The pixel buffer is allocated once here and reused by every call to [`Generator::generate`],
/// so each worker that wants to generate in parallel needs its own `Generator`.
pub struct Generator {
	mode: String,
	width: u32,
	height: u32,
	max_bit: u32,
	number_of_bit: u32,
	layout: PixelLayout,
	extension: String,
	format: ImageFormat,
	scratch: Scratch,
	rng: Rng
}

impl Generator {

	pub fn new(registry: &Registry, mode: impl AsRef<str>, width: u32, height: u32, uncompressed: bool) -> Result<Self,GenError> {

		let mode = mode.as_ref();

		let entry = registry.get(mode)
			.ok_or_else(|| GenError::unsupported(mode, "not found in the color mode configuration"))?;

		// pick the output file extension
		let extension =
			if uncompressed {
				entry.uncompressed_image_format.clone()
					.ok_or_else(|| GenError::unsupported(mode, "no uncompressed image format is configured"))?
			} else {
				COMPRESSED_FORMAT.to_string()
			};

		let layout = PixelLayout::resolve(entry)
			.ok_or_else(|| GenError::unsupported(mode, format!(
				"no pixel layout has {} channels of {} bits",
				entry.number_of_bit,
				entry.max_bit
			)))?;

		let format = ImageFormat::from_extension(&extension)
			.filter(|format| format.writing_enabled())
			.ok_or_else(|| GenError::unsupported(mode, format!("can't write image files of type: {}", extension)))?;

		// ImageBuffer::new panics when the buffer length overflows, so check it here first
		if width == 0 || height == 0 || layout.buffer_len(width, height).is_none() {
			return Err(GenError::InvalidDimensions {
				width,
				height
			});
		}

		debug!("Generator: mode={}, {}x{}, layout={:?}, format={}", mode, width, height, layout, extension);

		Ok(Self {
			mode: mode.to_string(),
			width,
			height,
			max_bit: entry.max_bit,
			number_of_bit: entry.number_of_bit,
			layout,
			extension,
			format,
			scratch: Scratch::new(layout, width, height),
			rng: Rng::new()
		})
	}

	/// swaps the random source for a seeded one, so the same seed always yields the same images
	pub fn with_seed(self, seed: u64) -> Self {
		Self {
			rng: Rng::with_seed(seed),
			.. self
		}
	}

	pub fn mode(&self) -> &str {
		&self.mode
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	pub fn max_bit(&self) -> u32 {
		self.max_bit
	}

	pub fn number_of_bit(&self) -> u32 {
		self.number_of_bit
	}

	/// the largest value any channel can take, ie 2^max_bit - 1
	pub fn max_value(&self) -> u16 {
		// max_bit is at most 16, or there would be no layout
		((1u32 << self.max_bit) - 1) as u16
	}

	pub fn layout(&self) -> PixelLayout {
		self.layout
	}

	pub fn extension(&self) -> &str {
		&self.extension
	}

	pub fn target_path(&self, base_name: impl AsRef<Path>) -> PathBuf {
		let mut path = base_name.as_ref()
			.as_os_str()
			.to_os_string();
		path.push(".");
		path.push(&self.extension);
		PathBuf::from(path)
	}

	/// a copy of the pixels from the most recent generate call
	pub fn snapshot(&self) -> DynamicImage {
		self.scratch.to_dynamic()
	}

	/// Fills the pixel buffer with fresh random values and saves it to `<base_name>.<extension>`.
	/// Returns the path of the new file.
	///
	/// Never overwrites an existing file: if the target path is taken,
	/// this fails with [`GenError::FileAlreadyExists`] and leaves the file alone.
	pub fn generate(&mut self, base_name: impl AsRef<Path>) -> Result<PathBuf,GenError> {

		let path = self.target_path(base_name);

		// check first so we don't waste time filling pixels for a file we can't write
		let exists = path.try_exists()
			.map_err(|e| GenError::Io {
				path: path.clone(),
				source: e
			})?;
		if exists {
			return Err(GenError::FileAlreadyExists {
				path
			});
		}

		let max = self.max_value();
		self.scratch.fill(&mut self.rng, max);

		self.save(&path)?;
		trace!("Generated image: {}", path.to_string_lossy());

		Ok(path)
	}

	fn save(&self, path: &Path) -> Result<(),GenError> {

		// create_new also catches a file that showed up after the existence check
		let file = OpenOptions::new()
			.write(true)
			.create_new(true)
			.open(path)
			.map_err(|e| match e.kind() {
				ErrorKind::AlreadyExists => GenError::FileAlreadyExists {
					path: path.to_path_buf()
				},
				_ => GenError::Io {
					path: path.to_path_buf(),
					source: e
				}
			})?;

		let result = self.encode(file, path);
		if result.is_err() {
			// don't leave a truncated image behind to block the next attempt
			fs::remove_file(path)
				.context(format!("Failed to remove partial image file: {}", path.to_string_lossy()))
				.warn_err()
				.ok();
		}

		result
	}

	fn encode(&self, file: File, path: &Path) -> Result<(),GenError> {

		let mut writer = BufWriter::new(file);

		self.scratch.write_to(&mut writer, self.format)
			.map_err(|e| GenError::Encoding {
				path: path.to_path_buf(),
				source: e
			})?;

		writer.flush()
			.map_err(|e| GenError::Io {
				path: path.to_path_buf(),
				source: e
			})?;

		Ok(())
	}
}
