//! Local filesystem storage implementation.
//!
//! All writes go through a temp file and a rename, so a reader never sees a
//! half-written file. The faculty directory is copied to `<file>.bak` before
//! it is replaced.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Config, ContentItem, FacultyRecord, PathsConfig, SiteMap};
use crate::storage::{ContentHeader, ContentStorage, format};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    paths: PathsConfig,
    institution: String,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            root_dir: root_dir.into(),
            paths: config.paths.clone(),
            institution: config.site.institution.clone(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root_dir.join(&self.paths.content_dir)
    }

    /// Output file of a section or endpoint.
    pub fn section_path(&self, name: &str) -> PathBuf {
        self.content_dir().join(format!("{name}.txt"))
    }

    pub fn faculty_path(&self) -> PathBuf {
        self.content_dir().join(&self.paths.faculty_file)
    }

    pub fn backup_path(&self) -> PathBuf {
        with_suffix(&self.faculty_path(), "bak")
    }

    pub fn site_map_path(&self) -> PathBuf {
        self.root_dir.join(&self.paths.sitemap_file)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::persistence(parent.display().to_string(), e))?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(path).await?;

        let tmp = with_suffix(path, "tmp");
        let fail = |e: std::io::Error| AppError::persistence(path.display().to_string(), e);

        let mut file = tokio::fs::File::create(&tmp).await.map_err(fail)?;
        file.write_all(bytes).await.map_err(fail)?;
        file.flush().await.map_err(fail)?;
        drop(file);

        tokio::fs::rename(&tmp, path).await.map_err(fail)?;
        Ok(())
    }

    /// Copy the current faculty file aside. Failure is logged, never fatal.
    async fn backup_faculty(&self) -> bool {
        let current = self.faculty_path();
        if !tokio::fs::try_exists(&current).await.unwrap_or(false) {
            return false;
        }

        let backup = self.backup_path();
        match tokio::fs::copy(&current, &backup).await {
            Ok(_) => {
                log::info!("Created backup at: {}", backup.display());
                true
            }
            Err(e) => {
                log::warn!("Error creating backup {}: {}", backup.display(), e);
                false
            }
        }
    }
}

/// `name.ext` → `name.ext.suffix`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(AppError::InvalidLocation(format!(
            "unusable output name {name:?}"
        )));
    }
    Ok(())
}

#[async_trait]
impl ContentStorage for LocalStorage {
    async fn save_section(
        &self,
        name: &str,
        header: &ContentHeader,
        items: &[ContentItem],
    ) -> Result<Option<PathBuf>> {
        check_name(name)?;
        if items.is_empty() {
            log::info!("No content found for: {}", header.url);
            return Ok(None);
        }

        let path = self.section_path(name);
        let text = format::render_section(header, items, &format::timestamp());
        self.write_bytes(&path, text.as_bytes()).await?;

        log::info!(
            "Saved {} item(s) to: {}",
            items.len(),
            path.display()
        );
        Ok(Some(path))
    }

    async fn save_faculty(&self, records: &[FacultyRecord]) -> Result<Option<PathBuf>> {
        if records.is_empty() {
            log::info!("No faculty records to save");
            return Ok(None);
        }

        self.backup_faculty().await;

        let path = self.faculty_path();
        let text = format::render_faculty(&self.institution, records, &format::timestamp());
        self.write_bytes(&path, text.as_bytes()).await?;

        log::info!(
            "Successfully saved {} faculty record(s) to: {}",
            records.len(),
            path.display()
        );
        Ok(Some(path))
    }

    async fn save_site_map(&self, map: &SiteMap) -> Result<PathBuf> {
        let path = self.site_map_path();
        let bytes = serde_json::to_vec_pretty(map)?;
        self.write_bytes(&path, &bytes).await?;
        log::info!("Site map written to: {}", path.display());
        Ok(path)
    }

    async fn load_site_map(&self) -> Result<Option<SiteMap>> {
        let path = self.site_map_path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::Location;

    fn storage(dir: &TempDir) -> LocalStorage {
        LocalStorage::new(dir.path(), &Config::default())
    }

    fn record(name: &str) -> FacultyRecord {
        FacultyRecord {
            name: Some(name.to_string()),
            ..FacultyRecord::default()
        }
    }

    #[tokio::test]
    async fn test_save_section_writes_file() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let header = ContentHeader::section("https://iiitkottayam.ac.in/#!/about", "about");
        let items = vec![ContentItem::new("p", "About the institute and its research")];

        let path = storage
            .save_section("about", &header, &items)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(path, dir.path().join("content/about.txt"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("URL: https://iiitkottayam.ac.in/#!/about\nSection: ABOUT\n"));
        assert!(text.contains("[P] About the institute and its research\n"));
        assert!(!dir.path().join("content/about.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_empty_section_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let header = ContentHeader::endpoint("https://iiitkottayam.ac.in/#!/contact");

        let saved = storage.save_section("contact", &header, &[]).await.unwrap();
        assert!(saved.is_none());
        assert!(!storage.content_dir().exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let header = ContentHeader::endpoint("u");
        let items = vec![ContentItem::new("p", "x")];

        assert!(storage.save_section("../x", &header, &items).await.is_err());
        assert!(storage.save_section("", &header, &items).await.is_err());
    }

    #[tokio::test]
    async fn test_faculty_backup_keeps_previous() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);

        storage.save_faculty(&[record("Dr. First")]).await.unwrap();
        storage.save_faculty(&[record("Dr. Second")]).await.unwrap();

        let current = std::fs::read_to_string(storage.faculty_path()).unwrap();
        let backup = std::fs::read_to_string(storage.backup_path()).unwrap();
        assert!(current.contains("Name: Dr. Second"));
        assert!(backup.contains("Name: Dr. First"));

        let files: Vec<_> = std::fs::read_dir(storage.content_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_backup_does_not_block_write() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);

        storage.save_faculty(&[record("Dr. First")]).await.unwrap();
        // A directory where the backup should go makes the copy fail.
        std::fs::create_dir(storage.backup_path()).unwrap();

        storage.save_faculty(&[record("Dr. Second")]).await.unwrap();

        let current = std::fs::read_to_string(storage.faculty_path()).unwrap();
        assert!(current.contains("Name: Dr. Second"));
        assert!(storage.backup_path().is_dir());
    }

    #[tokio::test]
    async fn test_empty_faculty_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);

        storage.save_faculty(&[record("Dr. First")]).await.unwrap();
        assert!(storage.save_faculty(&[]).await.unwrap().is_none());

        assert!(!storage.backup_path().exists());
        let current = std::fs::read_to_string(storage.faculty_path()).unwrap();
        assert!(current.contains("Total Faculty Members: 1"));
    }

    #[tokio::test]
    async fn test_site_map_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        assert!(storage.load_site_map().await.unwrap().is_none());

        let mut map = SiteMap::new(Location::root(), 2);
        map.hashbang_routes.insert(Location::route("placement"));
        storage.save_site_map(&map).await.unwrap();

        let loaded = storage.load_site_map().await.unwrap().unwrap();
        assert_eq!(loaded, map);
    }
}
