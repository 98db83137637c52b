use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use studydeck_core::{Card, CardStore, CoreError};
use tempfile::NamedTempFile;
use tokio::task;
use uuid::Uuid;

pub mod paths;

const FILE_VERSION: u32 = 1;

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileImage {
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cards: Vec<Card>,
}

/// Either the versioned image this crate writes, or a bare array of card
/// records as written by older clients. Legacy ids are arbitrary JSON
/// (usually a float timestamp) and get mapped to UUIDs on read.
#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Image(FileImage),
    Legacy(Vec<Value>),
}

/// Same legacy id always maps to the same UUID, so a legacy file read twice
/// before it is rewritten yields stable ids. Records without an id get a
/// fresh one.
fn legacy_card(mut record: Value) -> Result<Card, serde_json::Error> {
    if let Some(obj) = record.as_object_mut() {
        let old = obj.get("id").cloned().unwrap_or(Value::Null);
        let is_uuid = old.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok());
        if !is_uuid {
            let id = match &old {
                Value::Null => Uuid::new_v4(),
                other => Uuid::new_v5(&Uuid::NAMESPACE_OID, other.to_string().as_bytes()),
            };
            log::debug!("legacy card id {} mapped to {}", old, id);
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
    }
    serde_json::from_value(record)
}

#[derive(Clone)]
struct State {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cards: Vec<Card>,
}

impl State {
    fn new_empty() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            cards: Vec::new(),
        }
    }

    fn to_image(&self) -> FileImage {
        FileImage {
            version: FILE_VERSION,
            created_at: self.created_at,
            updated_at: self.updated_at,
            cards: self.cards.clone(),
        }
    }

    fn from_disk(disk: OnDisk) -> Result<Self, serde_json::Error> {
        match disk {
            OnDisk::Image(img) => Ok(Self {
                created_at: img.created_at,
                updated_at: img.updated_at,
                cards: img.cards,
            }),
            OnDisk::Legacy(records) => {
                let cards = records
                    .into_iter()
                    .map(legacy_card)
                    .collect::<Result<Vec<_>, _>>()?;
                let now = Utc::now();
                Ok(Self {
                    created_at: now,
                    updated_at: now,
                    cards,
                })
            }
        }
    }
}

pub struct JsonStore {
    path: PathBuf,
    backups_dir: PathBuf,
    max_backups: usize,
    state: RwLock<State>,
}

impl JsonStore {
    pub async fn open_default() -> Result<Self, CoreError> {
        let (file, backups) = paths::default_store_file();
        Self::open_with(file, backups, 10).await
    }

    pub async fn open_with(
        path: PathBuf,
        backups_dir: PathBuf,
        max_backups: usize,
    ) -> Result<Self, CoreError> {
        let max_backups = max_backups.max(1);
        ensure_parent_dirs(&path)?;
        ensure_dir(&backups_dir)?;
        let state = load_or_init(&path, &backups_dir, max_backups).await?;
        log::info!("opened card store {} ({} cards)", path.display(), state.cards.len());
        Ok(Self {
            path,
            backups_dir,
            max_backups,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `cards` to disk; the in-memory copy is only replaced once the
    /// write has succeeded.
    async fn save(&self, cards: &[Card]) -> Result<(), CoreError> {
        let next = State {
            created_at: self.state.read().created_at,
            updated_at: Utc::now(),
            cards: cards.to_vec(),
        };
        let snapshot = next.to_image();
        let path = self.path.clone();
        let backups = self.backups_dir.clone();
        let keep = self.max_backups;

        task::spawn_blocking(move || write_with_backup(&path, &backups, keep, &snapshot))
            .await
            .map_err(CoreError::storage)?
            .map_err(CoreError::storage)?;
        *self.state.write() = next;
        log::debug!("wrote {}", self.path.display());
        Ok(())
    }
}

fn ensure_parent_dirs(path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(path).map_err(CoreError::storage)
}

async fn load_or_init(path: &Path, backups_dir: &Path, keep: usize) -> Result<State, CoreError> {
    if path.exists() {
        let p = path.to_path_buf();
        let disk = task::spawn_blocking(move || {
            let buf = fs::read_to_string(&p)?;
            let v = serde_json::from_str::<OnDisk>(&buf)?;
            Ok::<OnDisk, io::Error>(v)
        })
        .await
        .map_err(CoreError::storage)?
        .map_err(CoreError::storage)?;
        if matches!(disk, OnDisk::Legacy(_)) {
            log::info!("{} holds a bare card array; it will be rewritten on next save", path.display());
        }
        State::from_disk(disk).map_err(CoreError::storage)
    } else {
        let st = State::new_empty();
        let img = st.to_image();
        write_with_backup(path, backups_dir, keep, &img).map_err(CoreError::storage)?;
        Ok(st)
    }
}

fn write_with_backup(
    path: &Path,
    backups_dir: &Path,
    max_backups: usize,
    img: &FileImage,
) -> Result<(), io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir_all(backups_dir)?;

    let json = serde_json::to_vec_pretty(img)?;
    let mut tmp = NamedTempFile::new_in(path.parent().unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;

    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S-%3f");
    let backup_path = backups_dir.join(format!("studydeck-{ts}.json"));
    let mut btmp = NamedTempFile::new_in(backups_dir)?;
    btmp.write_all(&json)?;
    btmp.flush()?;
    btmp.persist(&backup_path).map_err(|e| e.error)?;

    if let Err(e) = rotate_backups(backups_dir, max_backups) {
        log::warn!("backup rotation in {} failed: {}", backups_dir.display(), e);
    }

    Ok(())
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), io::Error> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    // Names embed the timestamp, so lexical order is age order.
    entries.sort_by_key(|e| e.file_name());
    if entries.len() > keep {
        for e in &entries[0..entries.len() - keep] {
            fs::remove_file(e.path())?;
        }
    }
    Ok(())
}

#[async_trait]
impl CardStore for JsonStore {
    async fn load_cards(&self) -> Result<Vec<Card>, CoreError> {
        Ok(self.state.read().cards.clone())
    }

    async fn save_cards(&self, cards: &[Card]) -> Result<(), CoreError> {
        self.save(cards).await
    }
}
