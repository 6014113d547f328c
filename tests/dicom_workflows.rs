//
// dicom_workflows.rs
// Dicom-Archive-Tools
//
// Integration-style tests covering image extraction, naming, metadata dumps, batch walks and the compression harness.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::path::{Path, PathBuf};

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::{tags, uids, StandardDataDictionary};
use dicom::object::{open_file, DefaultDicomObject, FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom_archive_tools::codec::{Codec, CodecFamily, ExternalCodec, RleCodec};
use dicom_archive_tools::error::{CodecError, RecordError};
use dicom_archive_tools::extract::{extract_record, ExtractOptions};
use dicom_archive_tools::harness::{diff_files, run_harness, HarnessOptions};
use dicom_archive_tools::metadata::{DumpBackend, MetadataDumper};
use dicom_archive_tools::models::FrameLayout;
use dicom_archive_tools::naming::derive_filename;
use dicom_archive_tools::tool::ToolCommand;
use dicom_archive_tools::{batch, transcode};
use tempfile::{tempdir, TempDir};

const SOP_INSTANCE_UID: &str = "1.2.826.0.1.3680043.2.1125.637";

struct Sample {
    frames: u32,
    rows: u16,
    columns: u16,
    bits_allocated: u16,
    with_pixels: bool,
}

impl Sample {
    fn mono8(frames: u32, rows: u16, columns: u16) -> Self {
        Sample {
            frames,
            rows,
            columns,
            bits_allocated: 8,
            with_pixels: true,
        }
    }
}

fn write_dicom(path: &Path, sample: &Sample) {
    // Construct a small Secondary Capture instance with predictable pixel values.
    let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
    obj.put(DataElement::new(
        tags::SOP_CLASS_UID,
        VR::UI,
        PrimitiveValue::from(uids::SECONDARY_CAPTURE_IMAGE_STORAGE),
    ));
    obj.put(DataElement::new(
        tags::SOP_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from(SOP_INSTANCE_UID),
    ));
    obj.put(DataElement::new(tags::STUDY_DATE, VR::DA, PrimitiveValue::from("20080930")));
    obj.put(DataElement::new(
        tags::ACQUISITION_DATE,
        VR::DA,
        PrimitiveValue::from("20081001"),
    ));
    obj.put(DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("MG")));
    obj.put(DataElement::new(
        tags::SERIES_DESCRIPTION,
        VR::LO,
        PrimitiveValue::from("R CC Tomo"),
    ));
    obj.put(DataElement::new(
        tags::PATIENT_NAME,
        VR::PN,
        PrimitiveValue::from("Test^Patient"),
    ));

    if sample.with_pixels {
        let bits = sample.bits_allocated;
        obj.put(DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)));
        obj.put(DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            PrimitiveValue::from("MONOCHROME2"),
        ));
        if sample.frames > 1 {
            obj.put(DataElement::new(
                tags::NUMBER_OF_FRAMES,
                VR::IS,
                PrimitiveValue::from(sample.frames.to_string()),
            ));
        }
        obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(sample.rows)));
        obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(sample.columns)));
        obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(bits)));
        obj.put(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(bits)));
        obj.put(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(bits - 1)));
        obj.put(DataElement::new(
            tags::PIXEL_REPRESENTATION,
            VR::US,
            PrimitiveValue::from(0_u16),
        ));

        let count = sample.frames as usize * sample.rows as usize * sample.columns as usize;
        if bits == 8 {
            // Long flat runs plus a gradient, so RLE has something to both compress and copy.
            let pixels: Vec<u8> = (0..count)
                .map(|i| if i % 10 < 6 { 0 } else { (i % 251) as u8 })
                .collect();
            obj.put(DataElement::new(tags::PIXEL_DATA, VR::OB, PrimitiveValue::from(pixels)));
        } else {
            let pixels: Vec<u16> = (0..count).map(|i| (i * 37 % 4096) as u16).collect();
            obj.put(DataElement::new(
                tags::PIXEL_DATA,
                VR::OW,
                PrimitiveValue::U16(pixels.into()),
            ));
        }
    }

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
        .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
        .media_storage_sop_instance_uid(SOP_INSTANCE_UID)
        .build()
        .expect("meta");

    let mut file_obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
    for elem in obj {
        file_obj.put(elem);
    }
    file_obj.write_to_file(path).expect("write dicom");
}

fn sample_file(name: &str, sample: &Sample) -> (TempDir, PathBuf) {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(name);
    write_dicom(&path, sample);
    (dir, path)
}

/// Open a written sample, change some elements and save it in place.
fn rewrite(path: &Path, edit: impl FnOnce(&mut DefaultDicomObject)) {
    let mut obj = open_file(path).expect("open");
    edit(&mut obj);
    obj.write_to_file(path).expect("rewrite dicom");
}

fn put_us(obj: &mut DefaultDicomObject, tag: Tag, value: u16) {
    obj.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read_dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn single_frame_record_produces_one_named_png() {
    let (dir, path) = sample_file("case.dcm", &Sample::mono8(1, 100, 100));
    let out = dir.path().join("out");

    let outcome = extract_record(&path, &out, &ExtractOptions::default()).expect("extract");

    assert_eq!(outcome.layout, FrameLayout::Single);
    assert!(outcome.name.contains("20081001"), "{}", outcome.name);
    assert!(outcome.name.contains("637"), "{}", outcome.name);
    assert_eq!(outcome.name, "20081001_R_CC_Tomo_637_single_frame");
    assert_eq!(files_in(&out), vec![format!("{}.png", outcome.name)]);

    let png = ::image::open(&outcome.images[0]).expect("png");
    assert_eq!((png.width(), png.height()), (100, 100));
}

#[test]
fn multi_frame_record_writes_numbered_frames_in_a_subdirectory() {
    let (dir, path) = sample_file("tomo.dcm", &Sample::mono8(3, 16, 12));
    let out = dir.path().join("out");

    let outcome = extract_record(&path, &out, &ExtractOptions::default()).expect("extract");

    assert_eq!(outcome.layout, FrameLayout::Multi(3));
    assert!(outcome.name.ends_with("_multi_frame"));
    let frame_dir = out.join(&outcome.name);
    assert_eq!(
        files_in(&frame_dir),
        (1..=3)
            .map(|i| format!("{}_{}.png", outcome.name, i))
            .collect::<Vec<_>>()
    );
    assert_eq!(outcome.images.len(), 3);
}

#[test]
fn record_without_pixels_is_metadata_only() {
    let sample = Sample {
        with_pixels: false,
        ..Sample::mono8(1, 1, 1)
    };
    let (dir, path) = sample_file("sr.dcm", &sample);
    let out = dir.path().join("out");
    let options = ExtractOptions {
        dumper: Some(MetadataDumper::new(DumpBackend::Builtin)),
        ..ExtractOptions::default()
    };

    let outcome = extract_record(&path, &out, &options).expect("extract");

    assert_eq!(outcome.layout, FrameLayout::NoImage);
    assert!(outcome.name.ends_with("_no_image"));
    assert!(outcome.images.is_empty());
    let dump = outcome.dump.expect("dump path");
    assert_eq!(dump, out.join(format!("{}.txt", outcome.name)));
    let text = fs::read_to_string(dump).expect("dump text");
    assert!(text.contains("(0008,0060) Modality CS MG"));
}

#[test]
fn pixel_budget_is_checked_before_decoding() {
    let (dir, path) = sample_file("big.dcm", &Sample::mono8(1, 100, 100));
    let options = ExtractOptions {
        max_pixel_bytes: 1000,
        ..ExtractOptions::default()
    };

    let err = extract_record(&path, &dir.path().join("out"), &options).unwrap_err();
    assert!(err.to_string().contains("10000"), "{err}");
}

#[test]
fn naming_is_idempotent() {
    let (_dir, path) = sample_file("case.dcm", &Sample::mono8(1, 8, 8));
    let obj = open_file(&path).expect("open");
    assert_eq!(derive_filename(&obj, &path), derive_filename(&obj, &path));
}

#[test]
fn batch_skips_files_that_are_not_dicom() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("input");
    fs::create_dir_all(input.join("nested")).expect("mkdir");
    write_dicom(&input.join("nested").join("a.DCM"), &Sample::mono8(1, 4, 4));
    fs::write(input.join("broken.dcm"), b"not a dicom file").expect("write");
    fs::write(input.join("notes.txt"), b"ignored").expect("write");

    let report = batch::process_directory(&input, &dir.path().join("out"), "dcm", &ExtractOptions::default());

    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].0.ends_with("broken.dcm"));
}

#[test]
fn dcmdump_backend_reports_a_missing_tool() {
    let (dir, path) = sample_file("case.dcm", &Sample::mono8(1, 4, 4));
    let obj = open_file(&path).expect("open");
    let dumper = MetadataDumper::new(DumpBackend::Dcmdump)
        .with_dcmdump(ToolCommand::new("dcmdump-that-does-not-exist"));

    let result = dumper.dump(&path, &obj, "case", dir.path());
    assert!(result.is_err());
    assert!(!dir.path().join("case.txt").exists());
}

#[test]
fn file_diffed_against_itself_is_empty() {
    let (_dir, path) = sample_file("case.dcm", &Sample::mono8(1, 8, 8));
    assert!(diff_files(&path, &path).expect("diff").is_empty());
}

#[test]
fn rle_round_trip_is_lossless() {
    let (dir, path) = sample_file("case.dcm", &Sample::mono8(2, 32, 30));
    let out = dir.path().join("rle");
    let codec = CodecFamily::Rle.build();

    let report = run_harness(&[&path], codec.as_ref(), &HarnessOptions::new(&out)).expect("harness");

    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert_eq!(report.trials.len(), 1);
    let trial = &report.trials[0];
    assert_eq!(trial.compressed_path, out.join("case_rle_compressed.dcm"));
    assert_eq!(trial.decompressed_path, out.join("case_rle_decompressed.dcm"));
    assert_eq!(trial.decompressed_size, trial.original_size);
    assert_eq!(trial.sizes.data_loss, 0);
    assert!(trial.compressed_size < trial.original_size);
    assert!(trial.diff.is_empty(), "{:?}", trial.diff);

    let compressed = open_file(&trial.compressed_path).expect("open compressed");
    assert_eq!(compressed.meta().transfer_syntax(), uids::RLE_LOSSLESS);

    let report_text = fs::read_to_string(out.join("rle_comparison.txt")).expect("report");
    assert!(report_text.contains("=== rle run started"));
    assert!(report_text.contains("data loss: 0 bytes"));
}

#[test]
fn rle_handles_sixteen_bit_samples() {
    let sample = Sample {
        bits_allocated: 16,
        ..Sample::mono8(1, 10, 9)
    };
    let (dir, path) = sample_file("ct.dcm", &sample);
    let compressed = dir.path().join("c.dcm");
    let restored = dir.path().join("r.dcm");

    transcode::rle_compress(&path, &compressed).expect("compress");
    transcode::rle_decompress(&compressed, &restored).expect("decompress");

    let before = open_file(&path).expect("open");
    let after = open_file(&restored).expect("open");
    assert_eq!(
        before.element(tags::PIXEL_DATA).expect("pixels").to_bytes().expect("bytes"),
        after.element(tags::PIXEL_DATA).expect("pixels").to_bytes().expect("bytes"),
    );
}

#[test]
fn incompatible_file_is_skipped_untouched() {
    let sample = Sample {
        bits_allocated: 16,
        ..Sample::mono8(1, 4, 4)
    };
    let (dir, path) = sample_file("ct.dcm", &sample);
    let out = dir.path().join("jpeg");
    let codec = CodecFamily::JpegBaseline.build();

    let report = run_harness(&[&path], codec.as_ref(), &HarnessOptions::new(&out)).expect("harness");

    assert!(report.trials.is_empty());
    assert_eq!(report.incompatible.len(), 1);
    assert!(report.incompatible[0].1[0].contains("Bits Allocated"));
    assert!(!out.join("ct_jpeg-baseline_compressed.dcm").exists());
}

#[test]
fn missing_external_codec_is_recorded_as_a_failure() {
    let (dir, path) = sample_file("case.dcm", &Sample::mono8(1, 4, 4));
    let codec = ExternalCodec::new(
        "fake",
        ToolCommand::new("dcmcrle-that-does-not-exist"),
        ToolCommand::new("dcmdrle-that-does-not-exist"),
    );
    let options = HarnessOptions {
        output_dir: dir.path().join("fake"),
        write_report: false,
    };

    let report = run_harness(&[&path], &codec as &dyn Codec, &options).expect("harness");

    assert!(report.trials.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].1.contains("not found"), "{}", report.failed[0].1);
}

#[test]
fn overflowing_header_geometry_is_rejected_without_panicking() {
    let (dir, path) = sample_file("huge.dcm", &Sample::mono8(1, 4, 4));
    rewrite(&path, |obj| {
        obj.put(DataElement::new(
            tags::NUMBER_OF_FRAMES,
            VR::IS,
            PrimitiveValue::from("2147483647"),
        ));
        put_us(obj, tags::ROWS, 65535);
        put_us(obj, tags::COLUMNS, 65535);
        put_us(obj, tags::SAMPLES_PER_PIXEL, 3);
        put_us(obj, tags::BITS_ALLOCATED, 16);
        put_us(obj, tags::BITS_STORED, 16);
        put_us(obj, tags::HIGH_BIT, 15);
    });

    let err = extract_record(&path, &dir.path().join("out"), &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, RecordError::TooLarge { required: u64::MAX, .. }), "{err}");

    let err = transcode::rle_compress(&path, &dir.path().join("huge_rle.dcm")).unwrap_err();
    assert!(matches!(err, CodecError::Unsupported(_)), "{err}");
}

#[test]
fn unrenderable_geometry_is_named_but_not_drawn() {
    let (dir, path) = sample_file("cmyk.dcm", &Sample::mono8(1, 4, 4));
    rewrite(&path, |obj| put_us(obj, tags::SAMPLES_PER_PIXEL, 4));
    let (_empty_dir, empty) = sample_file("empty.dcm", &Sample::mono8(1, 4, 4));
    rewrite(&empty, |obj| put_us(obj, tags::ROWS, 0));

    for source in [&path, &empty] {
        let out = dir.path().join("out");
        let outcome = extract_record(source, &out, &ExtractOptions::default()).expect("extract");
        assert!(matches!(outcome.layout, FrameLayout::Unsupported(_)), "{:?}", outcome.layout);
        assert!(outcome.name.ends_with("_single_frame"));
        assert!(outcome.images.is_empty());
        assert!(files_in(&out).iter().all(|f| !f.ends_with(".png")));
    }
}

#[test]
fn eight_bit_monochrome_rle_keeps_every_sample_in_place() {
    let (dir, path) = sample_file("edge.dcm", &Sample::mono8(1, 5, 7));
    let pixels: Vec<u8> = (1..=35).collect();
    let expected = pixels.clone();
    rewrite(&path, |obj| {
        obj.put(DataElement::new(tags::PIXEL_DATA, VR::OB, PrimitiveValue::from(pixels)));
    });
    let compressed = dir.path().join("c.dcm");
    let restored = dir.path().join("r.dcm");

    RleCodec.compress(&path, &compressed).expect("compress");
    RleCodec.decompress(&compressed, &restored).expect("decompress");

    let after = open_file(&restored).expect("open");
    let bytes = after.element(tags::PIXEL_DATA).expect("pixels").to_bytes().expect("bytes");
    assert_eq!(bytes.as_ref(), expected.as_slice());
}

#[test]
fn lossy_round_trip_reports_loss_without_failing() {
    let (dir, path) = sample_file("mammo.dcm", &Sample::mono8(1, 64, 64));
    let out = dir.path().join("jpeg");
    let codec = CodecFamily::JpegBaseline.build();

    let report = run_harness(&[&path], codec.as_ref(), &HarnessOptions::new(&out)).expect("harness");

    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert!(report.incompatible.is_empty());
    let trial = &report.trials[0];
    assert_eq!(
        trial.sizes.data_loss,
        trial.original_size as i64 - trial.decompressed_size as i64
    );
    assert!(!trial.diff.is_empty());

    // The native copy carries nothing that only describes encapsulated data.
    assert!(trial.diff.inserted.iter().all(|l| !l.contains("(7FE0,0003)")), "{:?}", trial.diff.inserted);
    let restored = open_file(&trial.decompressed_path).expect("open decompressed");
    assert_eq!(restored.meta().transfer_syntax(), uids::EXPLICIT_VR_LITTLE_ENDIAN);
    assert!(restored.element(Tag(0x7FE0, 0x0003)).is_err());
}

#[test]
fn inputs_sharing_a_stem_keep_separate_artifacts() {
    let dir = tempdir().expect("tempdir");
    let first = dir.path().join("a").join("case.dcm");
    let second = dir.path().join("b").join("case.dcm");
    for path in [&first, &second] {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        write_dicom(path, &Sample::mono8(1, 8, 8));
    }
    let out = dir.path().join("rle");
    let codec = CodecFamily::Rle.build();

    let report = run_harness(&[&first, &second], codec.as_ref(), &HarnessOptions::new(&out)).expect("harness");

    assert_eq!(report.trials.len(), 2);
    assert_eq!(report.trials[0].compressed_path, out.join("case_rle_compressed.dcm"));
    assert_eq!(report.trials[1].compressed_path, out.join("case_2_rle_compressed.dcm"));
}
