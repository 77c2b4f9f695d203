use super::*;

fn base_command() -> EncodeCommand {
    EncodeCommand {
        playlist: "r1_playlist.txt".to_string(),
        overlay: None,
        filter: FilterArgs::Simple("scale=2:2".to_string()),
        fps: 24,
        output: "r1_output.mp4".to_string(),
    }
}

fn value_after<'a>(argv: &'a [String], flag: &str) -> Option<&'a str> {
    argv.iter()
        .position(|a| a == flag)
        .and_then(|i| argv.get(i + 1))
        .map(String::as_str)
}

#[test]
fn simple_filter_argv() {
    let argv = base_command().to_argv();
    assert_eq!(argv[0], "-y");
    assert_eq!(value_after(&argv, "-f"), Some("concat"));
    assert_eq!(value_after(&argv, "-safe"), Some("0"));
    assert_eq!(value_after(&argv, "-i"), Some("r1_playlist.txt"));
    assert_eq!(value_after(&argv, "-vf"), Some("scale=2:2"));
    assert_eq!(value_after(&argv, "-r"), Some("24"));
    assert_eq!(value_after(&argv, "-fps_mode"), Some("vfr"));
    assert_eq!(value_after(&argv, "-c:v"), Some("libx264"));
    assert_eq!(value_after(&argv, "-pix_fmt"), Some("yuv420p"));
    assert_eq!(value_after(&argv, "-movflags"), Some("+faststart"));
    assert_eq!(argv.last().map(String::as_str), Some("r1_output.mp4"));
    assert!(!argv.iter().any(|a| a == "-filter_complex"));
    assert_eq!(argv.iter().filter(|a| *a == "-i").count(), 1);
}

#[test]
fn overlay_adds_second_input_and_complex_graph() {
    let cmd = EncodeCommand {
        overlay: Some("r1_overlay.png".to_string()),
        filter: FilterArgs::Complex {
            graph: "[0:v]null[base];[base][1:v]overlay=0:0[vout]".to_string(),
            map: "[vout]".to_string(),
        },
        ..base_command()
    };
    let argv = cmd.to_argv();

    let inputs: Vec<&str> = argv
        .iter()
        .enumerate()
        .filter(|(_, a)| *a == "-i")
        .map(|(i, _)| argv[i + 1].as_str())
        .collect();
    assert_eq!(inputs, vec!["r1_playlist.txt", "r1_overlay.png"]);
    assert_eq!(value_after(&argv, "-map"), Some("[vout]"));
    assert!(value_after(&argv, "-filter_complex").is_some());
    assert!(!argv.iter().any(|a| a == "-vf"));
    assert_eq!(argv.last().map(String::as_str), Some("r1_output.mp4"));
}
