
use std::fs;
use std::path::{Path, PathBuf};

use assert_fs::TempDir;

use random_image::modes::Registry;


/// the color mode configuration that ships with the crate
pub fn bundled_modes_path() -> PathBuf {
	Path::new(env!("CARGO_MANIFEST_DIR"))
		.join(Registry::DEFAULT_PATH)
}


pub fn bundled_registry() -> Registry {
	Registry::load(bundled_modes_path())
		.expect("Failed to load bundled color modes")
}


/// A temporary working folder, optionally seeded with the bundled color mode configuration.
pub struct WorkDir {
	dir: TempDir
}

impl WorkDir {

	pub fn empty() -> WorkDir {
		Self {
			dir: TempDir::new()
				.expect("Failed to make temp folder")
		}
	}

	pub fn new() -> WorkDir {
		let work_dir = Self::empty();
		fs::copy(bundled_modes_path(), work_dir.path().join(Registry::DEFAULT_PATH))
			.expect("Failed to copy color mode configuration");
		work_dir
	}

	pub fn path(&self) -> &Path {
		self.dir.path()
	}

	pub fn join(&self, path: impl AsRef<Path>) -> PathBuf {
		self.path().join(path)
	}

	pub fn write(&self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
		let path = self.join(path);
		fs::write(&path, content)
			.expect(&format!("Failed to write file: {}", path.to_string_lossy()));
	}

	pub fn read(&self, path: impl AsRef<Path>) -> Vec<u8> {
		let path = self.join(path);
		fs::read(&path)
			.expect(&format!("Failed to read file: {}", path.to_string_lossy()))
	}

	/// file names in the given subfolder, sorted
	pub fn list(&self, subdir: impl AsRef<Path>) -> Vec<String> {
		let path = self.join(subdir);
		let mut names = fs::read_dir(&path)
			.expect(&format!("Failed to read dir: {}", path.to_string_lossy()))
			.map(|entry| {
				entry.expect("Failed to read dir entry")
					.file_name()
					.to_string_lossy()
					.to_string()
			})
			.collect::<Vec<_>>();
		names.sort();
		names
	}
}

impl AsRef<Path> for WorkDir {
	fn as_ref(&self) -> &Path {
		self.dir.path()
	}
}
