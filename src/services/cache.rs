use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::portal::parser::LoadCurveRow;

/// On-disk cache of captured exports. Each refresh leaves the raw CSV plus a
/// parsed JSON sidecar, so `/data?format=csv` can serve the portal bytes back.
pub struct CsvCache {
    cache_dir: PathBuf,
}

impl CsvCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if let Err(e) = fs::create_dir_all(&cache_dir) {
            tracing::warn!("⚠️ cache dir {} not created: {}", cache_dir.display(), e);
        }
        Self { cache_dir }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_name(pod: &str, date_from: &str, date_to: &str) -> String {
        let raw = format!("{}_{}_{}", pod, date_from, date_to);
        raw.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    }

    fn entry_path(&self, pod: &str, date_from: &str, date_to: &str, ext: &str) -> PathBuf {
        self.cache_dir
            .join(Self::entry_name(pod, date_from, date_to))
            .with_extension(ext)
    }

    pub fn store(
        &self,
        pod: &str,
        date_from: &str,
        date_to: &str,
        csv: &str,
        rows: &[LoadCurveRow],
    ) -> io::Result<PathBuf> {
        let csv_path = self.entry_path(pod, date_from, date_to, "csv");
        fs::write(&csv_path, csv)?;
        let json_path = self.entry_path(pod, date_from, date_to, "json");
        let body = serde_json::to_string_pretty(rows).map_err(io::Error::other)?;
        fs::write(&json_path, body)?;
        tracing::debug!("💾 cached export at {}", csv_path.display());
        Ok(csv_path)
    }

    pub fn load_csv(&self, pod: &str, date_from: &str, date_to: &str) -> Option<String> {
        fs::read_to_string(self.entry_path(pod, date_from, date_to, "csv")).ok()
    }

    pub fn entry_count(&self) -> usize {
        match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries
                .flatten()
                .filter(|e| e.path().extension().is_some_and(|x| x == "csv"))
                .count(),
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<LoadCurveRow> {
        vec![LoadCurveRow {
            ts: "2025-08-24T00:15:00".to_string(),
            value_kwh: 0.25,
            quality: None,
        }]
    }

    #[test]
    fn test_store_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CsvCache::new(dir.path());
        cache
            .store("IT001E123", "2025-08-01", "2025-08-24", "a;b\n1;2\n", &rows())
            .unwrap();
        let csv = cache.load_csv("IT001E123", "2025-08-01", "2025-08-24").unwrap();
        assert_eq!(csv, "a;b\n1;2\n");
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn test_missing_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CsvCache::new(dir.path());
        assert!(cache.load_csv("IT001E123", "2025-08-01", "2025-08-24").is_none());
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn test_entry_name_is_path_safe() {
        let name = CsvCache::entry_name("IT/001..E", "2025-08-01", "2025-08-24");
        assert!(!name.contains('/'));
        assert!(!name.contains('.'));
        assert_eq!(name, "IT_001__E_2025-08-01_2025-08-24");
    }
}
