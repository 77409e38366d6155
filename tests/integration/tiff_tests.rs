//! TIFF reader tests on generated files.
//!
//! Tests verify:
//! - Little-endian, big-endian and BigTIFF stacks are read plane by plane
//! - Multi-strip planes are reassembled
//! - Sample formats map to the right pixel types
//! - A real TIFF imports end to end through the mock OMEIS

use omeis_import::error::{FormatError, ImportError, TiffError};
use omeis_import::reader::{
    FileGrouper, MetadataSource, PixelType, PlaneReader, SeriesReader,
};
use omeis_import::{Importer, OmeisClient, TiffImageReader};

use super::test_utils::{sha1_hex, write_file, MockOmeis, StripTiff};

/// `count` planes where every byte of plane `p` starts a ramp at `p * 16`.
fn ramp_planes(layout: &StripTiff, count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|p| {
            (0..layout.plane_len())
                .map(|i| (p * 16 + i) as u8)
                .collect()
        })
        .collect()
}

async fn open(layout: &StripTiff, planes: &[Vec<u8>]) -> (TiffImageReader, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "stack.tif", &layout.build(planes));

    let mut reader = TiffImageReader::new();
    reader.map_id("stack.tif", &path);
    assert!(reader.is_recognized_format("stack.tif").await);
    reader.set_id("stack.tif").await.unwrap();
    (reader, dir)
}

async fn assert_planes(reader: &mut TiffImageReader, planes: &[Vec<u8>]) {
    assert_eq!(reader.image_count(), planes.len());
    for (z, expected) in planes.iter().enumerate() {
        let index = reader.index(z as u32, 0, 0).unwrap();
        assert_eq!(index, z);
        let plane = reader.open_bytes(index).await.unwrap();
        assert_eq!(&plane[..], &expected[..], "plane {}", z);
    }
}

// =============================================================================
// Byte Order and Container Variants
// =============================================================================

#[tokio::test]
async fn test_little_endian_stack() {
    let layout = StripTiff::new(3, 2, 16);
    let planes = ramp_planes(&layout, 3);
    let (mut reader, _dir) = open(&layout, &planes).await;

    assert_eq!(reader.series_count(), 1);
    assert_eq!(
        (reader.size_x(), reader.size_y(), reader.size_z(), reader.size_c(), reader.size_t()),
        (3, 2, 3, 1, 1)
    );
    assert_eq!(reader.pixel_type(), PixelType::Uint16.code());
    assert!(reader.is_little_endian());
    assert_eq!(reader.used_files(), Some(vec![Some("stack.tif".to_string())]));
    assert_planes(&mut reader, &planes).await;
}

#[tokio::test]
async fn test_big_endian_signed_stack() {
    let layout = StripTiff::new(4, 4, 16).big_endian().sample_format(2);
    let planes = ramp_planes(&layout, 2);
    let (mut reader, _dir) = open(&layout, &planes).await;

    assert_eq!(reader.pixel_type(), PixelType::Int16.code());
    assert!(!reader.is_little_endian());
    assert_planes(&mut reader, &planes).await;
}

#[tokio::test]
async fn test_bigtiff_float_stack() {
    let layout = StripTiff::new(2, 2, 32).bigtiff().sample_format(3);
    let planes = ramp_planes(&layout, 2);
    let (mut reader, _dir) = open(&layout, &planes).await;

    assert_eq!(reader.pixel_type(), PixelType::Float.code());
    assert_planes(&mut reader, &planes).await;
}

#[tokio::test]
async fn test_big_endian_bigtiff() {
    let layout = StripTiff::new(2, 3, 8).bigtiff().big_endian();
    let planes = ramp_planes(&layout, 1);
    let (mut reader, _dir) = open(&layout, &planes).await;

    assert_eq!(reader.pixel_type(), PixelType::Uint8.code());
    assert!(!reader.is_little_endian());
    assert_planes(&mut reader, &planes).await;
}

#[tokio::test]
async fn test_multi_strip_planes() {
    // Three strips per plane, the last one short
    let layout = StripTiff::new(5, 5, 8).rows_per_strip(2);
    let planes = ramp_planes(&layout, 2);
    let (mut reader, _dir) = open(&layout, &planes).await;

    assert_planes(&mut reader, &planes).await;
}

#[tokio::test]
async fn test_multi_strip_bigtiff() {
    let layout = StripTiff::new(4, 3, 16).bigtiff().rows_per_strip(1);
    let planes = ramp_planes(&layout, 2);
    let (mut reader, _dir) = open(&layout, &planes).await;

    assert_planes(&mut reader, &planes).await;
}

// =============================================================================
// Metadata and Errors
// =============================================================================

#[tokio::test]
async fn test_metadata_document_describes_stack() {
    let layout = StripTiff::new(3, 2, 16).big_endian();
    let planes = ramp_planes(&layout, 4);
    let (reader, _dir) = open(&layout, &planes).await;

    let document = reader.metadata_document().unwrap();
    assert_eq!(document.pixels_count(), 1);

    let xml = document.to_xml().unwrap();
    assert!(xml.contains("Name=\"stack.tif\""));
    assert!(xml.contains("PixelType=\"uint16\""));
    assert!(xml.contains("BigEndian=\"true\""));
    assert!(xml.contains("SizeZ=\"4\""));
}

#[tokio::test]
async fn test_plane_index_out_of_range() {
    let layout = StripTiff::new(2, 2, 8);
    let planes = ramp_planes(&layout, 2);
    let (mut reader, _dir) = open(&layout, &planes).await;

    assert!(matches!(
        reader.index(2, 0, 0),
        Err(FormatError::PlaneOutOfRange { .. })
    ));
    assert!(matches!(
        reader.open_bytes(5).await,
        Err(FormatError::PlaneOutOfRange { .. })
    ));
}

#[tokio::test]
async fn test_non_tiff_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "notes.txt", b"not an image at all");

    let mut reader = TiffImageReader::new();
    reader.map_id("notes.txt", &path);
    assert!(!reader.is_recognized_format("notes.txt").await);
    assert!(matches!(
        reader.set_id("notes.txt").await,
        Err(FormatError::UnsupportedFormat { .. })
    ));
}

#[tokio::test]
async fn test_oversized_dimensions_rejected() {
    // 0xFFFFFFFF x 0xFFFFFFFF doubles overflow u64; 70000 x 70000 bytes
    // does not, but cannot fit in the file
    let cases = [
        StripTiff::new(2, 2, 64).sample_format(3).declare_size(u32::MAX, u32::MAX),
        StripTiff::new(2, 2, 8).declare_size(70_000, 70_000),
        StripTiff::new(2, 2, 64).bigtiff().sample_format(3).declare_size(u32::MAX, u32::MAX),
    ];

    for layout in cases {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "huge.tif", &layout.build(&ramp_planes(&layout, 1)));

        let mut reader = TiffImageReader::new();
        reader.map_id("huge.tif", &path);
        let err = reader.set_id("huge.tif").await.unwrap_err();
        assert!(
            matches!(err, FormatError::Tiff(TiffError::InvalidTagValue { tag: "ImageWidth", .. })),
            "{:?}",
            err
        );
    }
}

#[tokio::test]
async fn test_import_oversized_tiff_allocates_nothing() {
    let layout = StripTiff::new(2, 2, 64)
        .sample_format(3)
        .declare_size(u32::MAX, u32::MAX);

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "huge.tif", &layout.build(&ramp_planes(&layout, 1)));
    let omeis = MockOmeis::new().with_file(4, "huge.tif", &path);
    let mut importer = Importer::new(TiffImageReader::new(), OmeisClient::new(omeis.clone()));

    let err = importer.import_ids(&[4]).await.unwrap_err();
    assert!(matches!(
        err,
        ImportError::Format(FormatError::Tiff(TiffError::InvalidTagValue { .. }))
    ));
    assert_eq!(omeis.call_count("NewPixels"), 0);
}

// =============================================================================
// End to End
// =============================================================================

#[tokio::test]
async fn test_import_big_endian_tiff() {
    let layout = StripTiff::new(2, 1, 16).big_endian();
    let planes = vec![vec![0x01, 0x02, 0x03, 0x04], vec![0x05, 0x06, 0x07, 0x08]];

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "stack.tif", &layout.build(&planes));
    let omeis = MockOmeis::new().with_file(11, "stack.tif", &path);

    let mut importer = Importer::new(TiffImageReader::new(), OmeisClient::new(omeis.clone()));
    let outcome = importer.import_ids(&[11]).await.unwrap();

    let expected = vec![0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07];
    assert_eq!(omeis.pixels_bytes(100), expected);
    assert_eq!(outcome.series[0].sha1, sha1_hex(&expected));
    assert_eq!(importer.reader().series_count(), 0);

    let calls = omeis.calls();
    assert!(calls.contains(&(
        "NewPixels".to_string(),
        "Dims=2,1,2,1,1,2 IsSigned=0 IsFloat=0".to_string()
    )));

    let xml = outcome.into_xml().unwrap();
    assert!(xml.contains("PixelType=\"Uint16\""));
    assert!(xml.contains("ImageServerID=\"100\""));
    assert!(xml.contains("DimensionOrder=\"XYZCT\""));
}

#[tokio::test]
async fn test_import_missing_file() {
    let omeis = MockOmeis::new().with_file(3, "gone.tif", "/nonexistent/gone.tif");
    let mut importer = Importer::new(TiffImageReader::new(), OmeisClient::new(omeis.clone()));

    let err = importer.import_ids(&[3]).await.unwrap_err();
    assert!(matches!(err, ImportError::Format(FormatError::Io(_))));
    assert_eq!(omeis.call_count("NewPixels"), 0);
}
