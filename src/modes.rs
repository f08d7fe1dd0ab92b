
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::GenError;


/// How one color mode stores its pixels, as described by the color mode configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeEntry {

	/// bit depth of one channel, so channel values span 0 ..= 2^max_bit - 1
	pub max_bit: u32,

	/// number of channels in one pixel
	pub number_of_bit: u32,

	/// file extension to use for uncompressed output, if the mode has one
	pub uncompressed_image_format: Option<String>
}

impl ModeEntry {

	pub fn new(max_bit: u32, number_of_bit: u32) -> Self {
		Self {
			max_bit,
			number_of_bit,
			uncompressed_image_format: None
		}
	}

	pub fn with_uncompressed(self, format: impl Into<String>) -> Self {
		Self {
			uncompressed_image_format: Some(format.into()),
			.. self
		}
	}
}


/// The color modes known to the generator, keyed by mode name.
/// Read once at startup and never changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
	modes: BTreeMap<String,ModeEntry>
}

impl Registry {

	/// where the binary looks for the color mode configuration, relative to the working directory
	pub const DEFAULT_PATH: &'static str = "bit_depth_info.json";

	pub fn load(path: impl AsRef<Path>) -> Result<Self,GenError> {

		let path = path.as_ref();
		let json = fs::read_to_string(path)
			.map_err(|e| match e.kind() {
				ErrorKind::NotFound => GenError::ConfigNotFound {
					path: path.to_path_buf()
				},
				_ => GenError::ConfigRead {
					path: path.to_path_buf(),
					source: e
				}
			})?;

		let registry = Self::parse(path.to_string_lossy(), &json)?;
		debug!("Loaded {} color modes from: {}", registry.len(), path.to_string_lossy());

		Ok(registry)
	}

	pub fn from_json(json: impl AsRef<str>) -> Result<Self,GenError> {
		Self::parse("JSON text", json.as_ref())
	}

	fn parse(origin: impl AsRef<str>, json: &str) -> Result<Self,GenError> {

		let origin = origin.as_ref();

		let value = serde_json::from_str::<Value>(json)
			.map_err(|e| GenError::parse(origin, e.to_string()))?;
		let Value::Object(obj) = value
			else { return Err(GenError::parse(origin, "top level is not an object")); };

		let modes = obj.into_iter()
			.map(|(name, value)| {
				let entry = parse_entry(&name, value)
					.map_err(|msg| GenError::parse(origin, msg))?;
				Ok((name, entry))
			})
			.collect::<Result<BTreeMap<_,_>,GenError>>()?;

		Ok(Self {
			modes
		})
	}

	pub fn get(&self, mode: impl AsRef<str>) -> Option<&ModeEntry> {
		self.modes.get(mode.as_ref())
	}

	/// iterates the modes in name order
	pub fn iter(&self) -> impl Iterator<Item=(&str,&ModeEntry)> {
		self.modes.iter()
			.map(|(name, entry)| (name.as_str(), entry))
	}

	pub fn len(&self) -> usize {
		self.modes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.modes.is_empty()
	}
}

impl<S:Into<String>> FromIterator<(S,ModeEntry)> for Registry {

	fn from_iter<I:IntoIterator<Item=(S,ModeEntry)>>(iter: I) -> Self {
		Self {
			modes: iter.into_iter()
				.map(|(name, entry)| (name.into(), entry))
				.collect()
		}
	}
}


fn parse_entry(name: &str, value: Value) -> Result<ModeEntry,String> {

	let Value::Object(obj) = value
		else { return Err(format!("mode '{}' is not an object", name)); };

	let max_bit = positive_int(name, &obj, "max_bit")?;
	let number_of_bit = positive_int(name, &obj, "number_of_bit")?;

	// a null format means the same thing as a missing one
	let uncompressed_image_format = match obj.get("uncompressed_image_format") {
		None | Some(Value::Null) => None,
		Some(Value::String(format)) => Some(format.clone()),
		Some(other) => return Err(format!("{}.uncompressed_image_format is not a string: {}", name, other))
	};

	Ok(ModeEntry {
		max_bit,
		number_of_bit,
		uncompressed_image_format
	})
}


fn positive_int(name: &str, obj: &Map<String,Value>, key: &str) -> Result<u32,String> {

	let value = obj.get(key)
		.ok_or_else(|| format!("missing {}.{}", name, key))?;

	value.as_u64()
		.filter(|&v| v > 0)
		.and_then(|v| u32::try_from(v).ok())
		.ok_or_else(|| format!("{}.{} is not a positive integer: {}", name, key, value))
}
