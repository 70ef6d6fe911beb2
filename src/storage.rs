use crate::error::{InquiraError, Result};
use crate::types::{Note, NoteId, NoteKind};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Storage key of the notes collection
pub const NOTES_KEY: &str = "notes";

const STORAGE_FILE: &str = "storage.json";

/// Note as written by versions without stable ids
#[derive(Debug, Deserialize)]
struct StoredNote {
    #[serde(default)]
    id: Option<NoteId>,
    text: String,
    #[serde(rename = "type")]
    kind: NoteKind,
}

/// Persisted ordered notes collection with change notifications
///
/// Every mutation replaces the whole collection. Each write goes to its own
/// temporary sibling which is then renamed, so readers never see a partial
/// write, even with several processes writing.
#[derive(Clone)]
pub struct NoteStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    changes: watch::Sender<Vec<Note>>,
}

impl NoteStore {
    /// Opens the store in `data_dir`, loading the current collection
    pub async fn open(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let (changes, _) = watch::channel(Vec::new());
        let store = Self {
            inner: Arc::new(StoreInner {
                path: data_dir.join(STORAGE_FILE),
                changes,
            }),
        };
        let notes = store.load_all().await?;
        store.inner.changes.send_replace(notes);
        Ok(store)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Receives the collection each time it changes
    pub fn subscribe(&self) -> watch::Receiver<Vec<Note>> {
        self.inner.changes.subscribe()
    }

    /// Current collection; empty when nothing has been persisted yet
    pub async fn load_all(&self) -> Result<Vec<Note>> {
        let object = self.read_object().await?;
        let Some(value) = object.get(NOTES_KEY) else {
            return Ok(Vec::new());
        };

        let stored: Vec<StoredNote> = serde_json::from_value(value.clone())?;
        let needs_ids = stored.iter().any(|note| note.id.is_none());
        let notes: Vec<Note> = stored
            .into_iter()
            .map(|note| Note {
                id: note.id.unwrap_or_else(NoteId::generate),
                text: note.text,
                kind: note.kind,
            })
            .collect();

        if needs_ids {
            info!(count = notes.len(), "assigning ids to stored notes");
            self.write_notes(&notes).await?;
        }
        Ok(notes)
    }

    /// Overwrites the entire collection
    pub async fn replace_all(&self, notes: Vec<Note>) -> Result<()> {
        self.write_notes(&notes).await?;
        debug!(count = notes.len(), "notes collection replaced");
        self.publish(notes);
        Ok(())
    }

    /// Appends one note.
    ///
    /// This is a read followed by a write with no compare-and-swap: two
    /// overlapping appends can race and one of them is lost. Callers issue
    /// appends one at a time.
    pub async fn append(&self, note: Note) -> Result<()> {
        let mut notes = self.load_all().await?;
        notes.push(note);
        self.replace_all(notes).await
    }

    /// Removes the note with `id`; unknown ids leave the collection unchanged
    pub async fn remove(&self, id: NoteId) -> Result<()> {
        let mut notes = self.load_all().await?;
        let before = notes.len();
        notes.retain(|note| note.id != id);
        if notes.len() == before {
            warn!(%id, "note to remove not found");
            return Ok(());
        }
        self.replace_all(notes).await
    }

    /// Replaces the notes in `ids` with `merged`, appended at the end
    pub async fn merge(&self, ids: &[NoteId], merged: Note) -> Result<()> {
        let mut notes = self.load_all().await?;
        notes.retain(|note| !ids.contains(&note.id));
        notes.push(merged);
        self.replace_all(notes).await
    }

    /// Sets the collection back to `[]`
    pub async fn reset(&self) -> Result<()> {
        info!("resetting all notes");
        self.replace_all(Vec::new()).await
    }

    /// Reloads from disk and notifies subscribers if another writer changed it
    pub async fn refresh(&self) -> Result<bool> {
        let notes = self.load_all().await?;
        Ok(self.publish(notes))
    }

    /// Periodically picks up writes made by other processes
    pub fn spawn_watcher(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match store.refresh().await {
                    Ok(true) => debug!("notes changed on disk"),
                    Ok(false) => {}
                    Err(err) => warn!(error = %err, "could not reload notes"),
                }
            }
        })
    }

    fn publish(&self, notes: Vec<Note>) -> bool {
        self.inner.changes.send_if_modified(|current| {
            if *current == notes {
                return false;
            }
            *current = notes;
            true
        })
    }

    async fn read_object(&self) -> Result<Map<String, Value>> {
        let contents = match tokio::fs::read_to_string(&self.inner.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(err.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(object) => Ok(object),
            _ => Err(InquiraError::Serialization(format!(
                "{} does not hold a JSON object",
                self.inner.path.display()
            ))),
        }
    }

    async fn write_notes(&self, notes: &[Note]) -> Result<()> {
        let mut object = self.read_object().await?;
        object.insert(NOTES_KEY.to_string(), serde_json::to_value(notes)?);
        let contents = serde_json::to_string_pretty(&Value::Object(object))?;

        let path = self.inner.path.clone();
        tokio::task::spawn_blocking(move || persist_atomically(&path, contents.as_bytes()))
            .await
            .map_err(|err| InquiraError::Storage(err.to_string()))?
    }
}

/// Writes `contents` to a uniquely named sibling of `path`, then renames it
/// over `path`. Concurrent writers never share a temporary file.
fn persist_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| InquiraError::from(err.error))?;
    Ok(())
}
