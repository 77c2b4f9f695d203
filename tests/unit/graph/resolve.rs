use super::*;

fn png(name: &str, width: u32, height: u32) -> SourceBlob {
    let img = image::RgbaImage::new(width, height);
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    SourceBlob::new(name, Some("image/png".into()), buf)
}

fn no_frames() -> Vec<SourceBlob> {
    Vec::new()
}

fn auto() -> ConversionSettings {
    ConversionSettings::default()
}

#[test]
fn auto_takes_componentwise_max() {
    let frames = [png("a", 800, 600), png("b", 640, 480), png("c", 1000, 500)];
    let d = resolve(&auto(), &frames);
    assert_eq!(
        d,
        Dimensions {
            width: 1000,
            height: 600
        }
    );
}

#[test]
fn auto_rounds_odd_maxima_up() {
    let frames = [png("a", 801, 600), png("b", 640, 599)];
    let d = resolve(&auto(), &frames);
    assert_eq!(
        d,
        Dimensions {
            width: 802,
            height: 600
        }
    );

    let d = resolve(&auto(), &[png("odd", 3, 5)]);
    assert_eq!(d, Dimensions { width: 4, height: 6 });
}

#[test]
fn fixed_mode_ignores_frames() {
    let settings = auto()
        .with_resolution(ResolutionMode::Fixed {
            width: 1280,
            height: 720,
        })
        .unwrap();
    let frames = [png("big", 4000, 3000)];
    assert_eq!(resolve(&settings, &frames), RESOLUTION_720P);
    assert_eq!(resolve(&settings, &no_frames()), RESOLUTION_720P);
}

#[test]
fn unmeasurable_frames_fall_back() {
    let junk = SourceBlob::new("junk.png", Some("image/png".into()), b"not an image".to_vec());
    assert_eq!(resolve(&auto(), &[junk.clone()]), RESOLUTION_720P);
    assert_eq!(resolve(&auto(), &no_frames()), RESOLUTION_720P);

    // Unmeasurable frames are skipped, the rest still count.
    let d = resolve(&auto(), &[junk, png("ok", 320, 240)]);
    assert_eq!(d, Dimensions { width: 320, height: 240 });
}

#[test]
fn results_are_always_even() {
    let sizes = [(1, 1), (2, 3), (333, 777), (1919, 1081), (4096, 2160)];
    for (w, h) in sizes {
        let d = resolve(&auto(), &[png("x", w, h)]);
        assert!(d.width.is_multiple_of(2) && d.height.is_multiple_of(2), "{w}x{h} -> {d:?}");
    }
    let odd_fixed = ConversionSettings {
        resolution: ResolutionMode::Fixed {
            width: 641,
            height: 481,
        },
        ..auto()
    };
    assert_eq!(
        resolve(&odd_fixed, &no_frames()),
        Dimensions {
            width: 642,
            height: 482
        }
    );

    let huge_fixed = ConversionSettings {
        resolution: ResolutionMode::Fixed {
            width: u32::MAX,
            height: u32::MAX,
        },
        ..auto()
    };
    assert!(huge_fixed.validate().is_err());
    let d = resolve(&huge_fixed, &no_frames());
    assert!(d.width.is_multiple_of(2) && d.height.is_multiple_of(2), "{d:?}");
    assert_eq!(d.width, crate::foundation::core::MAX_DIMENSION);
}
