
use std::io;
use std::path::PathBuf;

use thiserror::Error;


/// Everything that can go wrong while loading color modes or generating images.
///
/// None of these are retried: the batch driver stops on the first one,
/// unless it was asked to skip output files that already exist.
#[derive(Debug, Error)]
pub enum GenError {

	#[error("Color mode configuration not found at: {}", path.to_string_lossy())]
	ConfigNotFound {
		path: PathBuf
	},

	#[error("Failed to read color mode configuration at: {}", path.to_string_lossy())]
	ConfigRead {
		path: PathBuf,
		#[source]
		source: io::Error
	},

	#[error("Failed to parse color mode configuration from {origin}: {msg}")]
	ConfigParse {
		origin: String,
		msg: String
	},

	#[error("The mode you requested, '{mode}', is not supported: {reason}")]
	UnsupportedMode {
		mode: String,
		reason: String
	},

	#[error("Image dimensions {width}x{height} are empty, or too large to hold in memory")]
	InvalidDimensions {
		width: u32,
		height: u32
	},

	#[error("Output file already exists: {}", path.to_string_lossy())]
	FileAlreadyExists {
		path: PathBuf
	},

	#[error("Failed to write image file: {}", path.to_string_lossy())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error
	},

	#[error("Failed to encode image file: {}", path.to_string_lossy())]
	Encoding {
		path: PathBuf,
		#[source]
		source: image::ImageError
	}
}

impl GenError {

	pub(crate) fn unsupported(mode: impl AsRef<str>, reason: impl Into<String>) -> Self {
		Self::UnsupportedMode {
			mode: mode.as_ref().to_string(),
			reason: reason.into()
		}
	}

	pub(crate) fn parse(origin: impl AsRef<str>, msg: impl Into<String>) -> Self {
		Self::ConfigParse {
			origin: origin.as_ref().to_string(),
			msg: msg.into()
		}
	}
}
