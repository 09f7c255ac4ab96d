//! Local APOD cache: an image directory paired with a SQLite store.
//!
//! [`CacheManager::ensure_cached`] is the only write path. It guarantees that a
//! date's image is on disk and recorded exactly once, and hands back the record
//! id that every later lookup goes through.

pub mod store;

use crate::apod::{image_url, ApodSource};
use crate::utils::{apod_file_name, content_hash, save_image};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::fs::{create_dir_all, read, remove_file};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use store::{ApodRecord, ApodStore, NewApodRecord};

pub const CACHE_DIR_NAME: &str = "image_cache";
pub const CACHE_DB_NAME: &str = "apod_cache.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub cache_dir: PathBuf,
    pub db_path: PathBuf,
}

impl CacheConfig {
    pub fn for_parent(parent: &Path) -> Self {
        let cache_dir = parent.join(CACHE_DIR_NAME);
        let db_path = cache_dir.join(CACHE_DB_NAME);
        Self { cache_dir, db_path }
    }

    /// Same locations, resolved against the working directory so that stored
    /// file paths stay valid from anywhere.
    pub fn into_absolute(self) -> Result<Self> {
        Ok(Self {
            cache_dir: std::path::absolute(&self.cache_dir)?,
            db_path: std::path::absolute(&self.db_path)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApodDisplayInfo {
    pub title: String,
    pub explanation: String,
    pub file_path: PathBuf,
}

impl From<ApodRecord> for ApodDisplayInfo {
    fn from(record: ApodRecord) -> Self {
        Self {
            title: record.title,
            explanation: record.explanation,
            file_path: record.file_path,
        }
    }
}

pub struct CacheManager<S> {
    config: CacheConfig,
    store: ApodStore,
    source: S,
}

/// Cache manager without a remote source, for read-only consumers such as the viewer.
pub type CacheReader = CacheManager<()>;

impl<S> CacheManager<S> {
    /// Sets up `<parent>/image_cache` and its database. Existing data is kept.
    pub fn initialize(parent: &Path, source: S) -> Result<Self> {
        Self::with_config(CacheConfig::for_parent(parent), source)
    }

    pub fn with_config(config: CacheConfig, source: S) -> Result<Self> {
        let config = config
            .into_absolute()
            .map_err(|e| Error::StoreInitFailed(e.to_string()))?;
        create_dir_all(&config.cache_dir).map_err(|e| {
            Error::StoreInitFailed(format!("{}: {}", config.cache_dir.display(), e))
        })?;
        let store = ApodStore::open(&config.db_path)?;
        debug!(cache_dir = %config.cache_dir.display(), "image cache initialized");

        Ok(Self {
            config,
            store,
            source,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &ApodStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn display_info(&self, id: i64) -> Result<ApodDisplayInfo> {
        self.store
            .find_by_id(id)?
            .map(ApodDisplayInfo::from)
            .ok_or_else(|| Error::NotFound(format!("APOD record {}", id)))
    }

    pub fn record_for_date(&self, date: NaiveDate) -> Result<Option<ApodRecord>> {
        self.store.find_by_date(date)
    }

    /// Path of the cached image for `date`, if it is cached and still on disk.
    pub fn file_path_for_date(&self, date: NaiveDate) -> Result<Option<PathBuf>> {
        Ok(self
            .store
            .find_by_date(date)?
            .map(|record| record.file_path)
            .filter(|path| path.is_file()))
    }

    pub fn all_titles(&self) -> Result<Vec<String>> {
        self.store.list_all_titles()
    }

    pub fn all_records(&self) -> Result<Vec<ApodRecord>> {
        self.store.list_all()
    }

    pub fn latest_date(&self) -> Result<Option<NaiveDate>> {
        self.store.latest_date()
    }

    /// Picks where new content for `title` goes. A name already holding other
    /// content, on disk or in the store, gets a `_<date>` suffix instead of being
    /// replaced.
    fn target_path(
        &self,
        title: &str,
        url: &str,
        date: NaiveDate,
        hash: &str,
    ) -> Result<PathBuf> {
        let path = self.config.cache_dir.join(apod_file_name(title, url));
        if !self.path_taken(&path, hash)? {
            return Ok(path);
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = match path.extension() {
            Some(ext) => format!("{}_{}.{}", stem, date, ext.to_string_lossy()),
            None => format!("{}_{}", stem, date),
        };
        Ok(self.config.cache_dir.join(file_name))
    }

    fn path_taken(&self, path: &Path, hash: &str) -> Result<bool> {
        if path.exists() && content_hash(&read(path)?) != hash {
            return Ok(true);
        }
        Ok(self
            .store
            .find_by_path(path)?
            .iter()
            .any(|record| record.content_hash.as_deref() != Some(hash)))
    }
}

impl<S: ApodSource> CacheManager<S> {
    /// Makes sure the APOD for `date` is cached and returns its record id.
    ///
    /// Dates already recorded with their image on disk are answered from the
    /// store without touching the network. Nothing is recorded unless the image
    /// bytes were downloaded.
    pub async fn ensure_cached(&self, date: NaiveDate) -> Result<i64> {
        let existing = self.store.find_by_date(date)?;
        if let Some(record) = &existing {
            if record.file_path.is_file() {
                info!(%date, id = record.id, "APOD already in cache");
                return Ok(record.id);
            }
            warn!(
                %date,
                path = %record.file_path.display(),
                "cached image is missing, downloading it again"
            );
        }

        let apod = self.source.fetch_info(date).await?;
        info!(%date, title = %apod.title, "retrieved APOD metadata");

        let url = image_url(&apod).ok_or_else(|| Error::UnsupportedMedia(apod.media_type.clone()))?;
        let bytes = self.source.download(url).await?;
        let hash = content_hash(&bytes);

        if let Some(record) = existing {
            return self.restore_file(&record, &apod.title, url, &bytes, &hash);
        }

        let (file_path, wrote_file) = match self.store.find_by_hash(&hash)? {
            Some(duplicate) if duplicate.file_path.is_file() => {
                debug!(
                    %date,
                    other = %duplicate.date,
                    "image identical to an already cached APOD, sharing its file"
                );
                (duplicate.file_path, false)
            }
            _ => {
                let path = self.target_path(&apod.title, url, date, &hash)?;
                let existed = path.exists();
                save_image(&bytes, &path)?;
                (path, !existed)
            }
        };

        let inserted = self.store.insert(&NewApodRecord {
            date,
            title: &apod.title,
            explanation: &apod.explanation,
            file_path: &file_path,
            content_hash: Some(&hash),
        });

        match inserted {
            Ok(id) => {
                info!(%date, id, path = %file_path.display(), "added new APOD to cache");
                Ok(id)
            }
            Err(e) => {
                if wrote_file {
                    if let Err(cleanup) = remove_file(&file_path) {
                        warn!(path = %file_path.display(), "failed to remove new image: {}", cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    /// Writes re-downloaded bytes for a record whose file went missing. The
    /// recorded path is reused unless the content changed while other records
    /// still point at that path, in which case the record moves to a new file.
    fn restore_file(
        &self,
        record: &ApodRecord,
        title: &str,
        url: &str,
        bytes: &[u8],
        hash: &str,
    ) -> Result<i64> {
        let unchanged = record.content_hash.as_deref() == Some(hash);
        let shared = self
            .store
            .find_by_path(&record.file_path)?
            .iter()
            .any(|other| other.id != record.id);

        if unchanged || !shared {
            save_image(bytes, &record.file_path)?;
            if !unchanged {
                self.store.update_file(record.id, &record.file_path, hash)?;
            }
        } else {
            let path = self.target_path(title, url, record.date, hash)?;
            save_image(bytes, &path)?;
            self.store.update_file(record.id, &path, hash)?;
            info!(date = %record.date, path = %path.display(), "moved APOD to a new file");
        }

        Ok(record.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_for_parent() {
        let config = CacheConfig::for_parent(Path::new("/opt/apod"));
        assert_eq!(config.cache_dir, PathBuf::from("/opt/apod/image_cache"));
        assert_eq!(
            config.db_path,
            PathBuf::from("/opt/apod/image_cache/apod_cache.db")
        );
    }

    #[test]
    fn test_relative_parent_becomes_absolute() {
        let config = CacheConfig::for_parent(Path::new("relative/parent"))
            .into_absolute()
            .unwrap();
        assert!(config.cache_dir.is_absolute());
        assert!(config.db_path.is_absolute());
        assert!(config.cache_dir.ends_with("relative/parent/image_cache"));
    }

    #[test]
    fn test_target_path_avoids_names_owned_by_records() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheReader::initialize(dir.path(), ()).unwrap();
        let date = NaiveDate::from_ymd_opt(2021, 1, 15).unwrap();
        let owned = cache.config().cache_dir.join("Moon.png");
        cache
            .store()
            .insert(&NewApodRecord {
                date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                title: "Moon",
                explanation: "",
                file_path: &owned,
                content_hash: Some(&content_hash(b"full moon")),
            })
            .unwrap();

        let url = "https://example.com/moon.png";
        assert_eq!(
            cache.target_path("Moon", url, date, &content_hash(b"new moon")).unwrap(),
            cache.config().cache_dir.join("Moon_2021-01-15.png")
        );
        assert_eq!(
            cache.target_path("Moon", url, date, &content_hash(b"full moon")).unwrap(),
            owned
        );
    }

    #[test]
    fn test_display_info_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheReader::initialize(dir.path(), ()).unwrap();
        assert!(matches!(cache.display_info(7), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_target_path_suffixes_on_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheReader::initialize(dir.path(), ()).unwrap();
        let date = NaiveDate::from_ymd_opt(2022, 7, 12).unwrap();
        let url = "https://example.com/carina.png";

        let free = cache.target_path("Cosmic Cliffs", url, date, "h").unwrap();
        assert_eq!(free, cache.config().cache_dir.join("Cosmic_Cliffs.png"));

        save_image(b"other content", &free).unwrap();
        let suffixed = cache
            .target_path("Cosmic Cliffs", url, date, &content_hash(b"new content"))
            .unwrap();
        assert_eq!(
            suffixed,
            cache.config().cache_dir.join("Cosmic_Cliffs_2022-07-12.png")
        );

        let same = cache
            .target_path("Cosmic Cliffs", url, date, &content_hash(b"other content"))
            .unwrap();
        assert_eq!(same, free);
    }
}
