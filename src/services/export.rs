use crate::types::Note;
use color_eyre::Result;
use std::fs;
use std::path::Path;
use tracing::info;

/// Writes `notes` as a pretty-printed JSON array to `path`
pub fn export_notes(notes: &[Note], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(notes)?;
    fs::write(path, contents)?;
    info!(path = %path.display(), count = notes.len(), "notes exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NoteKind;

    #[test]
    fn test_export_writes_readable_array() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out").join("notes.json");
        let notes = vec![Note::raw("A"), Note::summary("- B")];

        export_notes(&notes, &path).expect("export");

        let contents = fs::read_to_string(&path).expect("read");
        assert!(contents.starts_with("[\n"));
        let parsed: Vec<Note> = serde_json::from_str(&contents).expect("json");
        assert_eq!(parsed, notes);
        assert_eq!(parsed[1].kind, NoteKind::Summary);
    }

    #[test]
    fn test_export_of_empty_collection() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("notes.json");
        export_notes(&[], &path).expect("export");
        assert_eq!(fs::read_to_string(&path).expect("read"), "[]");
    }
}
