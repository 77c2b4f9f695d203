use std::sync::atomic::AtomicBool;

use super::*;

struct FakeDecoder {
    fail_on: &'static [u8],
}

impl LegacyDecoder for FakeDecoder {
    fn decode(&self, raw: &[u8]) -> ReelResult<Vec<u8>> {
        if raw == self.fail_on {
            return Err(ReelError::decode("corrupt container"));
        }
        let mut out = b"PNG:".to_vec();
        out.extend_from_slice(raw);
        Ok(out)
    }
}

fn fake_cache(fail_on: &'static [u8]) -> Arc<DecoderCache> {
    Arc::new(DecoderCache::new(move || {
        Ok(Arc::new(FakeDecoder { fail_on }) as Arc<dyn LegacyDecoder>)
    }))
}

#[test]
fn legacy_detection_uses_mime_then_extension() {
    assert!(is_legacy_format("a.bin", Some("image/heic")));
    assert!(is_legacy_format("a.bin", Some(" IMAGE/HEIF ")));
    assert!(is_legacy_format("IMG_0001.HEIC", None));
    assert!(is_legacy_format("IMG_0001.heif", Some("")));
    assert!(!is_legacy_format("photo.jpg", Some("image/jpeg")));
    assert!(!is_legacy_format("heic", None));
}

#[test]
fn batch_with_one_failed_decode_keeps_the_rest() {
    let normalizer = FormatNormalizer::new(fake_cache(b"bad"));
    let files = vec![
        SourceBlob::new("a.png", Some("image/png".into()), b"a".to_vec()),
        SourceBlob::new("b.heic", None, b"bad".to_vec()),
        SourceBlob::new("c.jpg", Some("image/jpeg".into()), b"c".to_vec()),
    ];

    let out = normalizer.normalize_batch(files);
    let names: Vec<_> = out.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.png", "c.jpg"]);
    assert_eq!(out.converted_count, 0);
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].name, "b.heic");
    assert!(out.errors[0].message.contains("corrupt container"));
}

#[test]
fn converted_file_keeps_stem_and_gets_png_type() {
    let normalizer = FormatNormalizer::new(fake_cache(b"bad"));
    let out = normalizer.normalize_batch(vec![SourceBlob::new(
        "IMG_0042.HEIC",
        None,
        b"pix".to_vec(),
    )]);
    assert_eq!(out.converted_count, 1);
    assert!(out.errors.is_empty());
    let f = &out.files[0];
    assert_eq!(f.name, "IMG_0042.png");
    assert_eq!(f.mime.as_deref(), Some("image/png"));
    assert_eq!(f.bytes.as_slice(), b"PNG:pix");
}

#[test]
fn decoder_loads_lazily_and_once() {
    let cache = fake_cache(b"bad");
    let normalizer = FormatNormalizer::new(Arc::clone(&cache));

    normalizer.normalize_batch(vec![SourceBlob::new("a.png", None, vec![1])]);
    assert_eq!(cache.load_count(), 0);
    assert!(!cache.is_loaded());

    normalizer.normalize_batch(vec![
        SourceBlob::new("a.heic", None, vec![1]),
        SourceBlob::new("b.heic", None, vec![2]),
    ]);
    normalizer.normalize_batch(vec![SourceBlob::new("c.heic", None, vec![3])]);
    assert_eq!(cache.load_count(), 1);
    assert!(cache.is_loaded());
}

#[test]
fn failed_load_is_reported_per_file_and_retried_later() {
    let healthy = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&healthy);
    let cache = Arc::new(DecoderCache::new(move || {
        if flag.load(Ordering::SeqCst) {
            Ok(Arc::new(FakeDecoder { fail_on: b"" }) as Arc<dyn LegacyDecoder>)
        } else {
            Err(ReelError::decode("decoder unavailable"))
        }
    }));
    let normalizer = FormatNormalizer::new(Arc::clone(&cache));

    let out = normalizer.normalize_batch(vec![
        SourceBlob::new("a.heic", None, vec![1]),
        SourceBlob::new("b.heic", None, vec![2]),
    ]);
    assert!(out.files.is_empty());
    assert_eq!(out.errors.len(), 2);
    assert_eq!(cache.load_count(), 1);

    healthy.store(true, Ordering::SeqCst);
    let out = normalizer.normalize_batch(vec![SourceBlob::new("a.heic", None, vec![1])]);
    assert_eq!(out.converted_count, 1);
    assert_eq!(cache.load_count(), 2);
}

#[test]
fn ffmpeg_decoder_load_fails_for_missing_executable() {
    let missing = PathBuf::from("stillreel-no-such-ffmpeg");
    let err = FfmpegLegacyDecoder::load(missing.clone()).unwrap_err();
    assert!(matches!(err, ReelError::Decode(_)));
    assert!(err.to_string().contains("stillreel-no-such-ffmpeg"));

    let cache = DecoderCache::ffmpeg(missing);
    let normalizer = FormatNormalizer::new(Arc::new(cache));
    let out = normalizer.normalize_batch(vec![SourceBlob::new("x.heic", None, vec![1, 2])]);
    assert!(out.files.is_empty());
    assert_eq!(out.errors.len(), 1);
}
