use super::*;

#[test]
fn vfs_names_must_be_flat() {
    validate_vfs_name("frame_00001.png").unwrap();
    assert!(validate_vfs_name("").is_err());
    assert!(validate_vfs_name("..").is_err());
    assert!(validate_vfs_name("a/b.png").is_err());
    assert!(validate_vfs_name("a\\b.png").is_err());
}

#[test]
fn memory_engine_initializes_once() {
    let engine = MemoryEngine::new();
    assert!(!engine.is_initialized());
    engine.initialize().unwrap();
    engine.initialize().unwrap();
    assert!(engine.is_initialized());
    assert_eq!(engine.init_calls(), 2);
}

#[test]
fn memory_engine_filesystem_round_trip() {
    let engine = MemoryEngine::new();
    engine.write_file("a.png", b"abc").unwrap();
    assert_eq!(engine.read_file("a.png").unwrap(), b"abc");
    engine.delete_file("a.png").unwrap();
    assert!(engine.read_file("a.png").is_err());
    assert!(engine.delete_file("a.png").is_err());
    assert_eq!(engine.written(), vec!["a.png"]);
    assert_eq!(engine.deleted(), vec!["a.png", "a.png"]);
}

#[test]
fn memory_engine_execute_produces_output_or_scripted_error() {
    let engine = MemoryEngine::new();
    let argv = vec!["-i".to_string(), "in.txt".to_string(), "out.mp4".to_string()];
    assert!(engine.execute(&argv).is_err());

    engine.initialize().unwrap();
    engine.execute(&argv).unwrap();
    assert_eq!(engine.file("out.mp4").unwrap(), MEMORY_ENGINE_OUTPUT);
    assert_eq!(engine.executed(), vec![argv.clone()]);

    engine.set_fault(MemoryEngineFault::Execute("Invalid filtergraph".into()));
    let err = engine.execute(&argv).unwrap_err();
    assert!(err.to_string().contains("Invalid filtergraph"));
}

#[test]
fn memory_engine_scripted_init_failure() {
    let engine = MemoryEngine::with_fault(MemoryEngineFault::Initialize("wasm fetch failed".into()));
    assert!(engine.initialize().is_err());
    assert!(!engine.is_initialized());
}

#[test]
fn ffmpeg_engine_requires_initialize() {
    let engine = FfmpegEngine::new("definitely-not-ffmpeg-stillreel");
    assert!(!engine.is_initialized());
    assert!(engine.write_file("a.png", b"x").is_err());
    assert!(engine.execute(&[]).is_err());
    assert!(engine.initialize().is_err());
    assert!(!engine.is_initialized());
}

#[test]
fn ffmpeg_engine_scratch_filesystem() {
    let engine = FfmpegEngine::default();
    if !is_ffmpeg_available(engine.ffmpeg_path()) {
        return;
    }
    engine.initialize().unwrap();
    engine.initialize().unwrap();
    engine.write_file("a.txt", b"hello").unwrap();
    assert_eq!(engine.read_file("a.txt").unwrap(), b"hello");
    engine.delete_file("a.txt").unwrap();
    assert!(engine.read_file("a.txt").is_err());
    assert!(engine.write_file("../escape.txt", b"x").is_err());

    let err = engine
        .execute(&["-v".into(), "error".into(), "-i".into(), "missing.png".into()])
        .unwrap_err();
    assert!(matches!(err, ReelError::Engine(_)));
}
