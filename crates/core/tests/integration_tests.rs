//! Integration tests for heic2png-core.
//!
//! Most tests drive the batch with a decoder that reads the payload as any
//! format the `image` crate understands, so they run without libheif.
//! Everything after decoding is the production path. The `heic` module
//! converts real HEIC files and needs the `libheif` feature (on by default).
//!
//! Run with: cargo test --package heic2png-core --test integration_tests

use heic2png_core::{
    BatchConfig, ConversionError, ConversionUnit, Converter, DecodeError, FileSelection,
    ImageDecoder, OverwritePolicy, PngEncoder, Task,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Decodes PNG (or any other image-crate format) payloads.
struct PayloadDecoder;

impl ImageDecoder for PayloadDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        image::load_from_memory(bytes).map_err(|e| DecodeError(e.to_string()))
    }
}

fn converter(config: BatchConfig) -> Converter {
    Converter::new(config, Arc::new(PayloadDecoder)).unwrap()
}

fn pattern(seed: u8) -> DynamicImage {
    let mut img = RgbaImage::new(9, 7);
    for (x, y, p) in img.enumerate_pixels_mut() {
        *p = Rgba([
            seed.wrapping_add(x as u8 * 25),
            seed.wrapping_mul(3).wrapping_add(y as u8 * 31),
            (x * y) as u8,
            255 - (x as u8 * 10),
        ]);
    }
    DynamicImage::ImageRgba8(img)
}

/// Write a fake HEIC (PNG payload) file.
fn write_valid(dir: &Path, name: &str, seed: u8) -> PathBuf {
    let path = dir.join(name);
    pattern(seed)
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();
    path
}

fn write_invalid(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"\0\0\0\x18ftypheic garbage").unwrap();
    path
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ============================================================================
// Conversion unit
// ============================================================================

#[test]
fn test_round_trip_preserves_pixels() {
    let dir = TempDir::new().unwrap();
    let source = write_valid(dir.path(), "IMG_0001.HEIC", 42);
    let unit = ConversionUnit::new(
        Arc::new(PayloadDecoder),
        PngEncoder::default(),
        OverwritePolicy::Exclusive,
    );

    let task = Task::for_source(&source);
    assert_eq!(task.destination, dir.path().join("IMG_0001.png"));
    unit.convert(&task).unwrap();

    let written = image::open(&task.destination).unwrap();
    assert_eq!(written.to_rgba8(), pattern(42).to_rgba8());
}

#[test]
fn test_exclusive_policy_keeps_existing_destination() {
    let dir = TempDir::new().unwrap();
    let source = write_valid(dir.path(), "photo.heic", 1);
    let destination = dir.path().join("photo.png");
    fs::write(&destination, b"do not touch").unwrap();

    let unit = ConversionUnit::new(
        Arc::new(PayloadDecoder),
        PngEncoder::default(),
        OverwritePolicy::Exclusive,
    );
    let err = unit.convert(&Task::for_source(&source)).unwrap_err();

    assert!(matches!(err, ConversionError::DestinationExists { .. }));
    assert_eq!(fs::read(&destination).unwrap(), b"do not touch");
}

// ============================================================================
// Batch runs
// ============================================================================

#[test]
fn test_batch_converts_all_files() {
    let dir = TempDir::new().unwrap();
    let files: Vec<_> = (0..6)
        .map(|i| write_valid(dir.path(), &format!("img_{i}.heic"), i as u8))
        .collect();

    let report = converter(BatchConfig::with_workers(3)).run(files).unwrap();

    assert_eq!(report.files, 6);
    assert_eq!(report.workers, 3);
    assert_eq!(report.converted, 6);
    assert_eq!(report.errors, 0);
    assert_eq!(report.exit_code(), 0);
    for i in 0..6 {
        let png = image::open(dir.path().join(format!("img_{i}.png"))).unwrap();
        assert_eq!(png.to_rgba8(), pattern(i as u8).to_rgba8());
    }
}

#[test]
fn test_error_count_independent_of_worker_count() {
    for workers in [1, 2, 5, 10] {
        let dir = TempDir::new().unwrap();
        let mut files = Vec::new();
        for i in 0..10 {
            let name = format!("f{i:02}.heic");
            if i % 3 == 0 {
                files.push(write_invalid(dir.path(), &name));
            } else {
                files.push(write_valid(dir.path(), &name, i as u8));
            }
        }
        // A pre-existing destination fails at the create stage.
        fs::write(dir.path().join("f01.png"), b"existing").unwrap();
        // And a file that was never written fails at open.
        files.push(dir.path().join("missing.heic"));

        let report = converter(BatchConfig::with_workers(workers))
            .run(files)
            .unwrap();

        assert_eq!(report.files, 11, "workers={workers}");
        assert_eq!(report.errors, 6, "workers={workers}");
        assert_eq!(report.converted, 5, "workers={workers}");
        assert_eq!(report.exit_code(), 6);
    }
}

/// Records which worker threads decoded something.
#[derive(Default)]
struct ThreadRecordingDecoder {
    threads: Mutex<HashSet<String>>,
}

impl ImageDecoder for ThreadRecordingDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        let name = std::thread::current().name().unwrap_or("unnamed").to_string();
        self.threads.lock().unwrap().insert(name);
        PayloadDecoder.decode(bytes)
    }
}

#[test]
fn test_workers_clamped_to_file_count() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        write_valid(dir.path(), "a.heic", 1),
        write_valid(dir.path(), "b.heic", 2),
    ];
    let decoder = Arc::new(ThreadRecordingDecoder::default());

    let converter = Converter::new(BatchConfig::with_workers(16), decoder.clone()).unwrap();
    let report = converter.run(files).unwrap();

    assert_eq!(report.workers, 2);
    assert_eq!(report.pulls, report.files);
    assert!(report.workers <= report.files);
    assert_eq!(report.converted, 2);

    let threads = decoder.threads.lock().unwrap();
    assert!(!threads.is_empty() && threads.len() <= report.files);
    assert!(threads.iter().all(|t| t.starts_with("heic2png-worker-")));
}

#[test]
fn test_every_file_pulled_exactly_once() {
    let dir = TempDir::new().unwrap();
    let files: Vec<PathBuf> = (0..9)
        .map(|i| write_valid(dir.path(), &format!("f{i}.heic"), i))
        .collect();

    for workers in [1, 3, 20] {
        for entry in fs::read_dir(dir.path()).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().map_or(false, |e| e == "png") {
                fs::remove_file(path).unwrap();
            }
        }

        let report = converter(BatchConfig::with_workers(workers))
            .run(files.clone())
            .unwrap();
        assert_eq!(report.pulls, 9, "workers={workers}");
        assert_eq!(report.workers, workers.min(9), "workers={workers}");
        assert_eq!(report.converted, 9, "workers={workers}");
    }
}

#[test]
fn test_empty_batch_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let before = dir_entries(dir.path());

    let report = converter(BatchConfig::with_workers(4))
        .run_selection(&FileSelection::Directory(dir.path().to_path_buf()))
        .unwrap();

    assert_eq!(report.errors, 0);
    assert_eq!(report.workers, 0);
    assert_eq!(dir_entries(dir.path()), before);
}

#[test]
fn test_delete_on_success_removes_only_converted_sources() {
    let dir = TempDir::new().unwrap();
    let good = write_valid(dir.path(), "good.heic", 5);
    let bad = write_invalid(dir.path(), "bad.heic");

    let report = converter(BatchConfig::with_workers(2).delete_on_success(true))
        .run(vec![good.clone(), bad.clone()])
        .unwrap();

    assert_eq!(report.converted, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.errors, 1);
    assert!(!good.exists());
    assert!(bad.exists());
    assert!(dir.path().join("good.png").exists());
    assert!(!dir.path().join("bad.png").exists());
}

#[test]
fn test_force_overwrite_replaces_existing_png() {
    let dir = TempDir::new().unwrap();
    let source = write_valid(dir.path(), "again.heic", 9);
    fs::write(dir.path().join("again.png"), b"old").unwrap();

    let report = converter(BatchConfig::with_workers(1).overwrite(OverwritePolicy::Force))
        .run(vec![source])
        .unwrap();

    assert_eq!(report.errors, 0);
    let png = image::open(dir.path().join("again.png")).unwrap();
    assert_eq!(png.to_rgba8(), pattern(9).to_rgba8());
}

#[test]
fn test_directory_selection_only_picks_heic() {
    let dir = TempDir::new().unwrap();
    write_valid(dir.path(), "one.HEIC", 1);
    write_valid(dir.path(), "two.heic", 2);
    write_valid(dir.path(), "three.jpg", 3);

    let report = converter(BatchConfig::with_workers(4))
        .run_selection(&FileSelection::Directory(dir.path().to_path_buf()))
        .unwrap();

    assert_eq!(report.files, 2);
    assert_eq!(report.converted, 2);
    assert!(dir.path().join("one.png").exists());
    assert!(dir.path().join("two.png").exists());
    assert!(!dir.path().join("three.png").exists());
}

#[test]
fn test_unreadable_directory_is_setup_error() {
    let dir = TempDir::new().unwrap();
    let result = converter(BatchConfig::with_workers(1))
        .run_selection(&FileSelection::Directory(dir.path().join("nope")));

    assert!(matches!(result, Err(ConversionError::Discovery { .. })));
}

#[test]
fn test_buffered_queue_gives_same_result() {
    let dir = TempDir::new().unwrap();
    let files: Vec<_> = (0..8)
        .map(|i| write_valid(dir.path(), &format!("q{i}.heic"), i as u8))
        .collect();

    let report = converter(BatchConfig::with_workers(2).queue_capacity(4))
        .run(files)
        .unwrap();

    assert_eq!(report.converted, 8);
    assert_eq!(report.errors, 0);
}

// ============================================================================
// Real HEIC input
// ============================================================================

#[cfg(feature = "libheif")]
mod heic {
    use super::*;
    use libheif_rs::{
        Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
        RgbChroma,
    };

    /// Write a solid-color HEIC file.
    fn write_heic(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 3]) -> PathBuf {
        let mut image = Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb)).unwrap();
        image
            .create_plane(Channel::Interleaved, width, height, 8)
            .unwrap();
        {
            let planes = image.planes_mut();
            let plane = planes.interleaved.unwrap();
            let stride = plane.stride;
            let data = plane.data;
            for y in 0..height as usize {
                for x in 0..width as usize {
                    let at = y * stride + x * 3;
                    data[at..at + 3].copy_from_slice(&color);
                }
            }
        }

        let lib = LibHeif::new();
        let mut context = HeifContext::new().unwrap();
        let mut encoder = lib.encoder_for_format(CompressionFormat::Hevc).unwrap();
        encoder.set_quality(EncoderQuality::LossLess).unwrap();
        context.encode_image(&image, &mut encoder, None).unwrap();

        let path = dir.join(name);
        fs::write(&path, context.write_to_bytes().unwrap()).unwrap();
        path
    }

    #[test]
    fn test_default_build_converts_heic_directory() {
        let dir = TempDir::new().unwrap();
        let color = [30, 160, 220];
        let source = write_heic(dir.path(), "IMG_0001.HEIC", 40, 30, color);

        let converter = Converter::with_default_decoder(
            BatchConfig::with_workers(2).delete_on_success(true),
        )
        .unwrap();
        let report = converter
            .run_selection(&FileSelection::Directory(dir.path().to_path_buf()))
            .unwrap();

        assert_eq!(report.errors, 0);
        assert_eq!(report.converted, 1);
        assert_eq!(report.deleted, 1);
        assert!(!source.exists());

        let png = image::open(dir.path().join("IMG_0001.png")).unwrap().to_rgb8();
        assert_eq!(png.dimensions(), (40, 30));
        for (x, y) in [(0, 0), (20, 15), (39, 29)] {
            let pixel = png.get_pixel(x, y).0;
            for (a, e) in pixel.iter().zip(color) {
                assert!(a.abs_diff(e) <= 16, "{:?} vs {:?}", pixel, color);
            }
        }
    }
}
