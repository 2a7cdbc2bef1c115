use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use imgsniff::decode::{BitstreamFormat, PlatformDecoder, WebPCodec, WebPDecodeConfig, WebPFeatures};
use imgsniff::{
    AlphaInfo, Bitmap, BitmapError, ByteOrder, DecodeError, DecoderConfig, FormatAwareDecoder,
    ImageDecoding, ImageKind, PixelBuffer, PixelLayout, PlatformError, TargetSize, WebPStatus,
};

const WEBP_HEADER: &[u8] = b"RIFF\x00\x00\x00\x00WEBPVP8 \x00\x00";

#[derive(Default)]
struct Counters {
    platform_calls: AtomicUsize,
    probes: AtomicUsize,
    decodes: AtomicUsize,
    allocs: AtomicUsize,
    frees: AtomicUsize,
    last_config: Mutex<Option<WebPDecodeConfig>>,
}

impl Counters {
    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn delegate_calls(&self) -> usize {
        Self::get(&self.platform_calls) + Self::get(&self.probes) + Self::get(&self.decodes)
    }
}

struct FakePlatform {
    counters: Arc<Counters>,
    fail: bool,
}

impl PlatformDecoder for FakePlatform {
    fn decode(&self, _data: &[u8]) -> Result<Bitmap, PlatformError> {
        self.counters.platform_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BitmapError::ZeroDimensions {
                width: 0,
                height: 0,
            }
            .into());
        }
        Ok(Bitmap::from_buffer(1, 1, PixelLayout::Rgb, vec![1, 2, 3])?)
    }
}

struct CountedBuffer {
    bytes: Vec<u8>,
    counters: Arc<Counters>,
}

impl PixelBuffer for CountedBuffer {
    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for CountedBuffer {
    fn drop(&mut self) {
        self.counters.frees.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeWebP {
    counters: Arc<Counters>,
    features: Result<WebPFeatures, WebPStatus>,
    decode_status: Option<WebPStatus>,
    truncate_output: bool,
}

impl WebPCodec for FakeWebP {
    type Buffer = CountedBuffer;

    fn features(&self, _data: &[u8]) -> Result<WebPFeatures, WebPStatus> {
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        self.features
    }

    fn decode(&self, _data: &[u8], config: &WebPDecodeConfig) -> Result<CountedBuffer, WebPStatus> {
        self.counters.decodes.fetch_add(1, Ordering::SeqCst);
        *self.counters.last_config.lock().unwrap() = Some(*config);

        let (width, height) = config.output_size();
        let mut len = (width * height) as usize * config.layout().channels() as usize;
        if self.truncate_output {
            len -= 1;
        }

        self.counters.allocs.fetch_add(1, Ordering::SeqCst);
        let buffer = CountedBuffer {
            bytes: vec![0xAB; len],
            counters: self.counters.clone(),
        };

        match self.decode_status {
            Some(status) => Err(status),
            None => Ok(buffer),
        }
    }
}

fn features(width: u32, height: u32, has_alpha: bool) -> WebPFeatures {
    WebPFeatures {
        width,
        height,
        has_alpha,
        has_animation: false,
        format: BitstreamFormat::Lossy,
    }
}

struct Harness {
    counters: Arc<Counters>,
    decoder: FormatAwareDecoder<FakePlatform, FakeWebP>,
}

impl Harness {
    fn new(webp: Result<WebPFeatures, WebPStatus>) -> Self {
        Self::build(webp, false, None, false)
    }

    fn build(
        webp: Result<WebPFeatures, WebPStatus>,
        platform_fails: bool,
        decode_status: Option<WebPStatus>,
        truncate_output: bool,
    ) -> Self {
        let counters = Arc::new(Counters::default());
        let decoder = FormatAwareDecoder::with_backends(
            FakePlatform {
                counters: counters.clone(),
                fail: platform_fails,
            },
            FakeWebP {
                counters: counters.clone(),
                features: webp,
                decode_status,
                truncate_output,
            },
        );
        Self { counters, decoder }
    }

    fn last_config(&self) -> Option<WebPDecodeConfig> {
        *self.counters.last_config.lock().unwrap()
    }

    fn allocs(&self) -> usize {
        Counters::get(&self.counters.allocs)
    }

    fn frees(&self) -> usize {
        Counters::get(&self.counters.frees)
    }
}

fn with_prefix(prefix: &[u8]) -> Vec<u8> {
    let mut data = prefix.to_vec();
    data.resize(32, 0);
    data
}

#[test]
fn inputs_under_thirteen_bytes_yield_nothing() {
    let h = Harness::new(Ok(features(8, 8, false)));

    for len in 0..13 {
        let data = &WEBP_HEADER[..len];
        assert!(h.decoder.decode(data).is_none());
        assert!(matches!(
            h.decoder.try_decode(data, TargetSize::NONE),
            Err(DecodeError::TooShort { len: l }) if l == len
        ));
    }
    assert_eq!(h.counters.delegate_calls(), 0);
}

#[test]
fn thirteen_unmatched_bytes_touch_no_decoder() {
    let h = Harness::new(Ok(features(8, 8, false)));

    assert!(h.decoder.decode(&[0u8; 13]).is_none());
    assert!(matches!(
        h.decoder.try_decode(&[0u8; 13], TargetSize::NONE),
        Err(DecodeError::UnknownFormat)
    ));
    assert_eq!(h.counters.delegate_calls(), 0);
}

#[test]
fn common_formats_go_to_the_platform_decoder() {
    let h = Harness::new(Ok(features(8, 8, false)));

    for prefix in [&b"\xFF\xD8\xFF\xE0"[..], b"\x89PNG\r\n\x1a\n", b"GIF89a"] {
        let bitmap = h.decoder.decode(&with_prefix(prefix)).unwrap();
        assert_eq!(bitmap.dimensions(), (1, 1));
        assert_eq!(bitmap.pixels(), &[1, 2, 3]);
    }

    assert_eq!(Counters::get(&h.counters.platform_calls), 3);
    assert_eq!(Counters::get(&h.counters.probes), 0);
}

#[test]
fn platform_failure_is_passed_through() {
    let h = Harness::build(Ok(features(8, 8, false)), true, None, false);

    let png = with_prefix(b"\x89PNG\r\n\x1a\n");
    assert!(h.decoder.decode(&png).is_none());
    match h.decoder.try_decode(&png, TargetSize::NONE) {
        Err(DecodeError::Platform { kind, .. }) => assert_eq!(kind, ImageKind::Png),
        other => panic!("expected platform failure, got {other:?}"),
    }
    assert_eq!(Counters::get(&h.counters.probes), 0);
}

#[test]
fn platform_path_ignores_target_size() {
    let h = Harness::new(Ok(features(8, 8, false)));
    let bitmap = h
        .decoder
        .decode_with_size(&with_prefix(b"GIF87a"), (1, 1))
        .unwrap();
    assert_eq!(bitmap.dimensions(), (1, 1));
    assert!(h.last_config().is_none());
}

#[test]
fn opaque_webp_decodes_to_rgb() {
    let h = Harness::new(Ok(features(640, 480, false)));

    let bitmap = h.decoder.decode(WEBP_HEADER).unwrap();
    assert_eq!(bitmap.dimensions(), (640, 480));
    assert_eq!(bitmap.channels(), 3);
    assert_eq!(bitmap.bytes_per_row(), 640 * 3);
    assert_eq!(bitmap.bits_per_component(), 8);
    assert_eq!(bitmap.byte_order(), ByteOrder::Big32);
    assert_eq!(bitmap.alpha_info(), AlphaInfo::None);

    assert_eq!(h.allocs(), 1);
    assert_eq!(h.frees(), 0);
    drop(bitmap);
    assert_eq!(h.frees(), 1);
}

#[test]
fn alpha_webp_decodes_to_premultiplied_bgra() {
    let h = Harness::new(Ok(features(64, 32, true)));

    let bitmap = h.decoder.decode(WEBP_HEADER).unwrap();
    assert_eq!(bitmap.dimensions(), (64, 32));
    assert_eq!(bitmap.channels(), 4);
    assert_eq!(bitmap.bytes_per_row(), 64 * 4);
    assert_eq!(bitmap.byte_order(), ByteOrder::Little32);
    assert_eq!(bitmap.alpha_info(), AlphaInfo::PremultipliedFirst);
}

#[test]
fn straight_alpha_can_be_requested() {
    let mut h = Harness::new(Ok(features(16, 16, true)));
    h.decoder = h.decoder.with_config(DecoderConfig {
        premultiply_alpha: false,
    });

    let bitmap = h.decoder.decode(WEBP_HEADER).unwrap();
    assert_eq!(bitmap.layout(), PixelLayout::Bgra);
    assert_eq!(bitmap.alpha_info(), AlphaInfo::First);
    assert_eq!(bitmap.byte_order(), ByteOrder::Little32);
}

#[test]
fn smaller_target_scales_webp() {
    let h = Harness::new(Ok(features(800, 600, false)));

    let bitmap = h.decoder.decode_with_size(WEBP_HEADER, (400, 300)).unwrap();
    assert_eq!(bitmap.dimensions(), (400, 300));
    assert_eq!(h.last_config().unwrap().scaled_size(), Some((400, 300)));
}

#[test]
fn larger_target_keeps_native_size() {
    let h = Harness::new(Ok(features(400, 300, false)));

    let bitmap = h.decoder.decode_with_size(WEBP_HEADER, (800, 600)).unwrap();
    assert_eq!(bitmap.dimensions(), (400, 300));
    assert_eq!(h.last_config().unwrap().scaled_size(), None);
}

#[test]
fn mixed_target_keeps_native_size() {
    let h = Harness::new(Ok(features(800, 600, false)));

    let bitmap = h.decoder.decode_with_size(WEBP_HEADER, (400, 900)).unwrap();
    assert_eq!(bitmap.dimensions(), (800, 600));
    assert_eq!(h.last_config().unwrap().scaled_size(), None);
}

#[test]
fn probe_failure_stops_before_decoding() {
    let h = Harness::new(Err(WebPStatus::BitstreamError));

    assert!(h.decoder.decode(WEBP_HEADER).is_none());
    assert!(matches!(
        h.decoder.try_decode(WEBP_HEADER, TargetSize::NONE),
        Err(DecodeError::Probe(WebPStatus::BitstreamError))
    ));
    assert_eq!(Counters::get(&h.counters.probes), 2);
    assert_eq!(Counters::get(&h.counters.decodes), 0);
    assert_eq!(h.allocs(), 0);
}

#[test]
fn decode_failure_releases_the_buffer() {
    let h = Harness::build(
        Ok(features(10, 10, true)),
        false,
        Some(WebPStatus::OutOfMemory),
        false,
    );

    assert!(matches!(
        h.decoder.try_decode(WEBP_HEADER, TargetSize::NONE),
        Err(DecodeError::Decode(WebPStatus::OutOfMemory))
    ));
    assert_eq!(h.allocs(), 1);
    assert_eq!(h.frees(), 1);
}

#[test]
fn construction_failure_releases_the_buffer() {
    let h = Harness::build(Ok(features(10, 10, false)), false, None, true);

    assert!(h.decoder.decode(WEBP_HEADER).is_none());
    assert!(matches!(
        h.decoder.try_decode(WEBP_HEADER, TargetSize::NONE),
        Err(DecodeError::Bitmap(BitmapError::BufferTooSmall {
            required: 300,
            actual: 299
        }))
    ));
    assert_eq!(h.allocs(), 2);
    assert_eq!(h.frees(), 2);
}

#[test]
fn every_buffer_is_freed_exactly_once() {
    let h = Harness::new(Ok(features(32, 32, true)));

    let bitmaps: Vec<_> = (0u32..5)
        .map(|i| h.decoder.decode_with_size(WEBP_HEADER, (i, i)))
        .collect();
    assert!(bitmaps.iter().all(Option::is_some));
    assert_eq!(h.allocs(), 5);
    assert_eq!(h.frees(), 0);

    drop(bitmaps);
    assert_eq!(h.frees(), 5);
}

#[test]
fn decoder_is_shareable_across_threads() {
    let h = Harness::new(Ok(features(20, 10, false)));

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..25 {
                    let bitmap = h.decoder.decode(WEBP_HEADER).unwrap();
                    assert_eq!(bitmap.dimensions(), (20, 10));
                }
            });
        }
    });

    assert_eq!(h.allocs(), 100);
    assert_eq!(h.frees(), 100);
}

#[test]
fn usable_through_the_trait_object() {
    let h = Harness::new(Ok(features(3, 3, false)));
    let decoder: &dyn ImageDecoding = &h.decoder;

    assert!(decoder.decode(WEBP_HEADER).is_some());
    assert!(decoder.decode(b"not an image!").is_none());
}
