//! Idempotent store of generated audio assets

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use jiff::Timestamp;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;

use crate::error::{Result, TtsError};

const KEY_LEN: usize = 16;

/// Container format of a stored asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    /// Container for an ElevenLabs output format name
    pub fn from_output_format(output_format: &str) -> Self {
        if output_format.contains("mp3") { Self::Mp3 } else { Self::Wav }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
        }
    }
}

/// A generated asset on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub audio_id: String,
    pub path: PathBuf,
    pub format: AudioFormat,
    pub voice_id: String,
    pub created_at: Timestamp,
}

/// Cache key for a (text, voice) pair
///
/// First 16 hex characters of `SHA-256(text:voice)`.
pub fn asset_key(text: &str, voice_id: &str) -> String {
    let digest = Sha256::new()
        .chain_update(text.as_bytes())
        .chain_update(b":")
        .chain_update(voice_id.as_bytes())
        .finalize();

    digest
        .iter()
        .take(KEY_LEN / 2)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Audio ids are generated as `{key}-{millis}`; anything else is never served.
fn is_valid_audio_id(audio_id: &str) -> bool {
    !audio_id.is_empty()
        && audio_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Generated assets keyed by [`asset_key`]
///
/// Each key holds a cell that is filled at most once, so concurrent
/// requests for the same uncached key share a single generation. A failed
/// generation leaves the cell empty and the next request retries.
pub struct AssetStore {
    entries: DashMap<String, Arc<OnceCell<AssetRecord>>>,
    storage_dir: PathBuf,
    ttl: Duration,
}

impl AssetStore {
    pub fn new(storage_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            storage_dir: storage_dir.into(),
            ttl,
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Number of stored assets
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the asset for (text, voice), generating it on a miss
    ///
    /// The boolean is `true` when the asset already existed.
    pub async fn get_or_generate<F, Fut>(
        &self,
        text: &str,
        voice_id: &str,
        output_format: &str,
        generate: F,
    ) -> Result<(AssetRecord, bool)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>>>,
    {
        let key = asset_key(text, voice_id);
        let cell = self.entries.entry(key.clone()).or_default().clone();

        let generated = AtomicBool::new(false);
        let flag = &generated;
        let storage_dir = &self.storage_dir;
        let key_ref = key.as_str();

        let result = cell
            .get_or_try_init(|| async move {
                flag.store(true, Ordering::Relaxed);

                let audio = generate().await?;
                let format = AudioFormat::from_output_format(output_format);
                let created_at = Timestamp::now();
                let audio_id = format!("{key_ref}-{}", created_at.as_millisecond());
                let path = storage_dir.join(format!("{audio_id}.{}", format.extension()));

                tokio::fs::create_dir_all(storage_dir).await?;
                tokio::fs::write(&path, &audio).await?;

                tracing::info!(%audio_id, bytes = audio.len(), "stored generated audio");

                Ok::<_, TtsError>(AssetRecord {
                    audio_id,
                    path,
                    format,
                    voice_id: voice_id.to_owned(),
                    created_at,
                })
            })
            .await;

        // A failed generation leaves the cell in the map: waiters queued on
        // it take over, and the sweep drops it once nobody holds it.
        let record = result?;
        let cached = !generated.load(Ordering::Relaxed);

        if cached {
            tracing::debug!(audio_id = %record.audio_id, "serving cached audio");
        }

        Ok((record.clone(), cached))
    }

    fn find(&self, audio_id: &str) -> Option<AssetRecord> {
        let key = audio_id.split('-').next()?;

        self.entries
            .get(key)
            .and_then(|cell| cell.get().filter(|record| record.audio_id == audio_id).cloned())
    }

    /// Read an asset's bytes
    ///
    /// Falls back to `{id}.mp3` and `{id}.wav` in the storage directory
    /// for assets written before a restart.
    pub async fn read(&self, audio_id: &str) -> Result<(Vec<u8>, AudioFormat)> {
        if !is_valid_audio_id(audio_id) {
            return Err(TtsError::AssetNotFound(audio_id.to_owned()));
        }

        if let Some(record) = self.find(audio_id) {
            match tokio::fs::read(&record.path).await {
                Ok(audio) => return Ok((audio, record.format)),
                Err(error) => tracing::debug!(%audio_id, %error, "recorded asset file unreadable"),
            }
        }

        for format in [AudioFormat::Mp3, AudioFormat::Wav] {
            let path = self.storage_dir.join(format!("{audio_id}.{}", format.extension()));

            if let Ok(audio) = tokio::fs::read(&path).await {
                return Ok((audio, format));
            }
        }

        Err(TtsError::AssetNotFound(audio_id.to_owned()))
    }

    /// Remove assets older than the TTL and delete their files
    ///
    /// Returns the number of removed assets.
    pub async fn sweep(&self, now: Timestamp) -> usize {
        let ttl_ms = i128::try_from(self.ttl.as_millis()).unwrap_or(i128::MAX);
        let now_ms = i128::from(now.as_millisecond());

        self.entries
            .retain(|_, cell| cell.initialized() || Arc::strong_count(cell) > 1);

        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .get()
                    .is_some_and(|record| now_ms - i128::from(record.created_at.as_millisecond()) > ttl_ms)
            })
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;

        for key in expired {
            let Some((_, cell)) = self.entries.remove(&key) else {
                continue;
            };

            let Some(record) = cell.get() else {
                continue;
            };

            match tokio::fs::remove_file(&record.path).await {
                Ok(()) => {}
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(audio_id = %record.audio_id, "asset file already gone");
                }
                Err(error) => {
                    tracing::warn!(audio_id = %record.audio_id, %error, "failed to delete asset file");
                }
            }

            removed += 1;
        }

        if removed > 0 {
            tracing::info!(removed, "swept expired audio assets");
        }

        removed
    }
}
