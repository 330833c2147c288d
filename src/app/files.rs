//! Level and transcript loading for the runner

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::game::InputCommand;

/// One tick of scripted input for both combatants
pub type TranscriptFrame = [InputCommand; 2];

/// Errors raised while reading runner inputs from disk
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcript {} is not valid JSON: {source}", .path.display())]
    Transcript {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

async fn read(path: &Path) -> Result<String, FileError> {
    tokio::fs::read_to_string(path).await.map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read `0.txt` .. `{count-1}.txt`, dropping trailing blank lines
pub async fn load_levels(dir: &Path, count: usize) -> Result<Vec<String>, FileError> {
    let mut levels = Vec::with_capacity(count);
    for index in 0..count {
        let path = dir.join(format!("{index}.txt"));
        let text = read(&path).await?;
        debug!(level = index, bytes = text.len(), "Level file read");
        levels.push(text.trim_end_matches(['\r', '\n']).to_string());
    }
    Ok(levels)
}

/// Parse a transcript: a JSON array with one `[p0, p1]` pair per tick
pub fn parse_transcript(text: &str, path: &Path) -> Result<Vec<TranscriptFrame>, FileError> {
    serde_json::from_str(text).map_err(|source| FileError::Transcript {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn load_transcript(path: &Path) -> Result<Vec<TranscriptFrame>, FileError> {
    let text = read(path).await?;
    let frames = parse_transcript(&text, path)?;
    debug!(frames = frames.len(), "Transcript loaded");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_frames_default_missing_fields() {
        let text = r#"[
            [{"axis": 1.0, "jump_held": true}, {}],
            [{}, {"fire_pressed": true, "weapon_switch": "next"}]
        ]"#;
        let frames = parse_transcript(text, Path::new("t.json")).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0][0].axis, 1.0);
        assert!(frames[0][0].jump_held);
        assert_eq!(frames[0][1], InputCommand::idle());
        assert!(frames[1][1].fire_pressed);
    }

    #[test]
    fn bad_transcript_names_the_file() {
        let err = parse_transcript("[[{}]]", Path::new("broken.json")).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn missing_level_is_an_io_error() {
        let dir = std::env::temp_dir().join("duel_platformer_no_such_dir");
        let err = tokio_test::block_on(load_levels(&dir, 1)).unwrap_err();
        assert!(matches!(err, FileError::Io { .. }));
    }
}
