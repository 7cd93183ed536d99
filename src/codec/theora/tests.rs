use super::*;
use pretty_assertions::assert_eq;
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

fn cif_header() -> Vec<u8> {
    let mut data = vec![0x80];
    data.extend_from_slice(b"theora");
    data.extend_from_slice(&[3, 2, 1]); // version
    data.extend_from_slice(&22u16.to_be_bytes()); // 352 px
    data.extend_from_slice(&18u16.to_be_bytes()); // 288 px
    data.extend_from_slice(&[0x00, 0x01, 0x60]); // picture width 352
    data.extend_from_slice(&[0x00, 0x01, 0x20]); // picture height 288
    data.extend_from_slice(&[0, 0]); // picture offset
    data.extend_from_slice(&30_000u32.to_be_bytes());
    data.extend_from_slice(&1_001u32.to_be_bytes());
    data.extend_from_slice(&[0x00, 0x00, 0x0C]); // aspect 12
    data.extend_from_slice(&[0x00, 0x00, 0x0B]); // aspect 11
    data.push(2); // Rec. 470BG
    data.extend_from_slice(&[0x07, 0xA1, 0x20]); // 500000 bps
    // quality 48, shift 6, 4:2:0, padding
    data.extend_from_slice(&[0b1100_0000, 0b1100_0000]);
    data
}

impl Arbitrary for TheoraInfo {
    fn arbitrary(g: &mut Gen) -> Self {
        let u24 = |g: &mut Gen| u32::arbitrary(g) & 0x00FF_FFFF;
        TheoraInfo {
            version_minor: u8::arbitrary(g),
            version_revision: u8::arbitrary(g),
            frame_width_mbs: u16::arbitrary(g),
            frame_height_mbs: u16::arbitrary(g),
            picture_width: u24(g),
            picture_height: u24(g),
            picture_x: u8::arbitrary(g),
            picture_y: u8::arbitrary(g),
            frame_rate_numerator: u32::arbitrary(g),
            frame_rate_denominator: u32::arbitrary(g),
            pixel_aspect_numerator: u24(g),
            pixel_aspect_denominator: u24(g),
            colour_space: ColourSpace::from(u8::arbitrary(g)),
            nominal_bitrate: u24(g),
            quality: u8::arbitrary(g) & 0x3F,
            keyframe_granule_shift: u8::arbitrary(g) & 0x1F,
            pixel_format: PixelFormat::from_bits(u32::arbitrary(g)),
        }
    }
}

#[test]
fn test_decode_identification() {
    let info = TheoraInfo::decode(&cif_header()).unwrap();
    assert_eq!(info.version_minor, 2);
    assert_eq!(info.version_revision, 1);
    assert_eq!(info.frame_width(), 352);
    assert_eq!(info.frame_height(), 288);
    assert_eq!(info.picture_width, 352);
    assert_eq!(info.picture_height, 288);
    assert_eq!(info.frame_rate_numerator, 30_000);
    assert_eq!(info.frame_rate_denominator, 1_001);
    assert_eq!(info.pixel_aspect(), Some((12, 11)));
    assert_eq!(info.colour_space, ColourSpace::Rec470BG);
    assert_eq!(info.nominal_bitrate, 500_000);
    assert_eq!(info.quality, 48);
    assert_eq!(info.keyframe_granule_shift, 6);
    assert_eq!(info.pixel_format, PixelFormat::Yuv420);
    assert_eq!(info.width(), Some(352));
}

#[test]
fn test_encode_matches_reference_bytes() {
    let info = TheoraInfo::decode(&cif_header()).unwrap();
    let encoded = info.to_bytes().unwrap();
    assert_eq!(encoded.len(), IDENTIFICATION_SIZE);
    assert_eq!(&encoded[..], &cif_header()[..]);
}

#[test]
fn test_single_macroblock_frame() {
    let info = TheoraInfo::new(16, 16);
    assert_eq!(info.frame_width_mbs, 1);
    assert_eq!(info.frame_height_mbs, 1);
    let decoded = TheoraInfo::decode(&info.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.frame_width(), 16);
    assert_eq!(decoded.frame_height(), 16);

    // odd sizes round up to whole macroblocks
    let info = TheoraInfo::new(17, 8);
    assert_eq!(info.frame_width(), 32);
    assert_eq!(info.frame_height(), 16);
}

#[test]
fn test_rejects_other_major_versions() {
    let mut data = cif_header();
    data[7] = 2;
    match TheoraInfo::decode(&data) {
        Err(XiphError::UnsupportedVersion { codec, version }) => {
            assert_eq!(codec, CodecType::Theora);
            assert_eq!(version, 2);
        }
        other => panic!("expected version error, got {:?}", other),
    }
}

#[test]
fn test_rejects_truncated_header() {
    let data = cif_header();
    assert!(matches!(
        TheoraInfo::decode(&data[..41]),
        Err(XiphError::TruncatedPacket {
            needed: 42,
            available: 41
        })
    ));
}

#[test]
fn test_encode_rejects_wide_fields() {
    let mut info = TheoraInfo::new(64, 64);
    info.picture_width = 0x0100_0000;
    assert!(matches!(info.to_bytes(), Err(XiphError::InvalidData(_))));

    let mut info = TheoraInfo::new(64, 64);
    info.quality = 64;
    assert!(info.to_bytes().is_err());
}

#[test]
fn test_granule_to_frame() {
    let info = TheoraInfo::new(320, 240).with_keyframe_granule_shift(6).unwrap();
    // key frame 10, 3 frames later
    let granule = (10u64 << 6) | 3;
    assert_eq!(info.granule_to_frame(granule), 13);
    assert_eq!(info.granule_to_seconds(granule), 13.0 / 25.0);

    let flat = info.clone().with_keyframe_granule_shift(0).unwrap();
    assert_eq!(flat.granule_to_frame(42), 42);
}

#[test]
fn test_granule_shift_out_of_range() {
    let info = TheoraInfo::new(320, 240);
    assert!(matches!(
        info.clone().with_keyframe_granule_shift(32),
        Err(XiphError::InvalidData(_))
    ));
    assert!(info.clone().with_keyframe_granule_shift(31).is_ok());

    // a shift set directly on the field past the width of u64 must not panic
    let mut wide = info;
    wide.keyframe_granule_shift = 64;
    assert_eq!(wide.granule_to_frame(42), 42);
    wide.keyframe_granule_shift = 200;
    assert_eq!(wide.granule_to_frame(7), 7);
}

#[quickcheck]
fn prop_identification_round_trip(info: TheoraInfo) -> bool {
    let encoded = match info.to_bytes() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    match TheoraInfo::decode(&encoded) {
        Ok(decoded) => decoded.to_bytes().ok() == Some(encoded),
        Err(_) => false,
    }
}
