
mod util;


use galvanic_assert::{assert_that, matchers::*};

use random_image::batch::{BatchConfig, BatchReport, OnExisting};
use random_image::error::GenError;
use random_image::logging;

use crate::util::work_dir::{bundled_registry, WorkDir};


fn small_batch(work_dir: &WorkDir, count: u32) -> BatchConfig {
	BatchConfig {
		width: 4,
		height: 3,
		out_dir: work_dir.join("out"),
		count,
		seed: Some(12345),
		.. BatchConfig::default()
	}
}


#[test]
fn sequential_names() {
	let _logging = logging::init_test();

	let work_dir = WorkDir::empty();
	let config = small_batch(&work_dir, 3);

	let report = config.run(&bundled_registry())
		.expect("batch should succeed");

	assert_that!(&report, eq(BatchReport { written: 3, skipped: 0 }));
	assert_that!(&work_dir.list("out"), eq(vec![
		"test-0.bmp".to_string(),
		"test-1.bmp".to_string(),
		"test-2.bmp".to_string()
	]));

	let img = image::open(work_dir.join("out/test-2.bmp"))
		.expect("Failed to read image");
	assert_that!(&img.width(), eq(4));
	assert_that!(&img.height(), eq(3));
}


#[test]
fn creates_nested_folder_and_offsets_numbers() {
	let _logging = logging::init_test();

	let work_dir = WorkDir::empty();
	let config = BatchConfig {
		out_dir: work_dir.join("a/b/c"),
		prefix: "noise_".to_string(),
		start: 7,
		mode: "RGB;16".to_string(),
		.. small_batch(&work_dir, 2)
	};

	config.run(&bundled_registry())
		.expect("batch should succeed");

	assert_that!(&work_dir.list("a/b/c"), eq(vec![
		"noise_7.png".to_string(),
		"noise_8.png".to_string()
	]));
}


#[test]
fn compressed() {
	let _logging = logging::init_test();

	let work_dir = WorkDir::empty();
	let config = BatchConfig {
		uncompressed: false,
		.. small_batch(&work_dir, 1)
	};

	config.run(&bundled_registry())
		.expect("batch should succeed");

	assert_that!(&work_dir.list("out"), eq(vec!["test-0.jpeg".to_string()]));
}


#[test]
fn stops_at_existing_file() {
	let _logging = logging::init_test();

	let work_dir = WorkDir::empty();
	std::fs::create_dir(work_dir.join("out"))
		.expect("Failed to make out folder");
	work_dir.write("out/test-1.bmp", "earlier output");

	let config = small_batch(&work_dir, 3);
	let err = config.run(&bundled_registry())
		.expect_err("batch should fail");

	let kind = err.downcast_ref::<GenError>();
	assert_that!(&matches!(kind, Some(GenError::FileAlreadyExists { .. })), eq(true));

	// the first image was written, the third was never attempted
	assert_that!(&work_dir.list("out"), eq(vec![
		"test-0.bmp".to_string(),
		"test-1.bmp".to_string()
	]));
	assert_that!(&work_dir.read("out/test-1.bmp"), eq(b"earlier output".to_vec()));
}


#[test]
fn skips_existing_file() {
	let _logging = logging::init_test();

	let work_dir = WorkDir::empty();
	std::fs::create_dir(work_dir.join("out"))
		.expect("Failed to make out folder");
	work_dir.write("out/test-1.bmp", "earlier output");

	let config = BatchConfig {
		on_existing: OnExisting::Skip,
		.. small_batch(&work_dir, 3)
	};
	let report = config.run(&bundled_registry())
		.expect("batch should succeed");

	assert_that!(&report, eq(BatchReport { written: 2, skipped: 1 }));
	assert_that!(&work_dir.list("out").len(), eq(3));
	assert_that!(&work_dir.read("out/test-1.bmp"), eq(b"earlier output".to_vec()));
}


#[test]
fn unknown_mode_creates_nothing() {
	let _logging = logging::init_test();

	let work_dir = WorkDir::empty();
	let config = BatchConfig {
		mode: "CMYK".to_string(),
		.. small_batch(&work_dir, 3)
	};

	let err = config.run(&bundled_registry())
		.expect_err("batch should fail");

	let kind = err.downcast_ref::<GenError>();
	assert_that!(&matches!(kind, Some(GenError::UnsupportedMode { .. })), eq(true));
	assert_that!(&work_dir.join("out").exists(), eq(false));
}


#[test]
fn out_dir_is_a_file() {
	let _logging = logging::init_test();

	let work_dir = WorkDir::empty();
	work_dir.write("out", "not a folder");

	let result = small_batch(&work_dir, 1)
		.run(&bundled_registry());
	assert_that!(&result.is_err(), eq(true));
}
