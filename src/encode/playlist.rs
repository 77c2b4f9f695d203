use std::fmt;

/// One `file` directive of a concat-demuxer playlist.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaylistEntry {
    pub file: String,
    /// Seconds this file stays on screen. `None` only on the trailing repeat.
    pub duration: Option<f64>,
}

/// Concat-demuxer playlist (`ffconcat`-style `file` / `duration` pairs).
///
/// The demuxer ignores the duration of the last listed file, so [`Playlist::from_frames`]
/// lists the final frame a second time without one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Playlist {
    entries: Vec<PlaylistEntry>,
}

impl Playlist {
    /// Build from `(virtual name, seconds)` pairs in timeline order.
    pub fn from_frames<'a>(frames: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let mut entries: Vec<PlaylistEntry> = frames
            .into_iter()
            .map(|(file, secs)| PlaylistEntry {
                file: file.to_string(),
                duration: Some(secs),
            })
            .collect();
        if let Some(last) = entries.last() {
            let file = last.file.clone();
            entries.push(PlaylistEntry {
                file,
                duration: None,
            });
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all listed durations.
    pub fn total_secs(&self) -> f64 {
        self.entries.iter().filter_map(|e| e.duration).sum()
    }
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "file '{}'", escape_quoted(&entry.file))?;
            if let Some(secs) = entry.duration {
                writeln!(f, "duration {}", format_secs(secs))?;
            }
        }
        Ok(())
    }
}

// Quoted concat paths end the quote, emit an escaped quote, and reopen.
fn escape_quoted(name: &str) -> String {
    name.replace('\'', r"'\''")
}

fn format_secs(secs: f64) -> String {
    let s = format!("{secs:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() { "0".to_string() } else { s.to_string() }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/playlist.rs"]
mod tests;
