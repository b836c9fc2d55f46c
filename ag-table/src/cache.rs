//! Gzip-compressed JSON cache of a built table.
//!
//! The workbook is parsed once; afterwards the table is loaded from this blob.
//! A missing or unreadable cache is a configuration error: the caller has to
//! rebuild it from the workbook, nothing here rebuilds it implicitly.

use crate::{
    error::{AgeGradeError, Result},
    table::AgeGradeTable,
};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use log::info;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

impl AgeGradeTable {
    /// Serialize the table into the cache format.
    pub fn to_cache_bytes(&self) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        serde_json::to_writer(&mut encoder, self)
            .map_err(|e| AgeGradeError::Configuration(format!("cannot encode cache: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| AgeGradeError::Configuration(format!("cannot compress cache: {}", e)))
    }

    /// Deserialize a table from a cache blob.
    pub fn build_from_cache(blob: &[u8]) -> Result<Self> {
        let table: AgeGradeTable = serde_json::from_reader(GzDecoder::new(blob))
            .map_err(|e| AgeGradeError::Configuration(format!("corrupt cache: {}", e)))?;
        table
            .validate()
            .map_err(|e| AgeGradeError::Configuration(format!("corrupt cache: {}", e)))?;
        Ok(table)
    }

    /// Write the cache file, replacing any existing one.
    pub fn write_cache(&self, path: &Path) -> Result<()> {
        let bytes = self.to_cache_bytes()?;
        let file = File::create(path).map_err(|e| {
            AgeGradeError::Configuration(format!("cannot create {}: {}", path.display(), e))
        })?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&bytes)
            .and_then(|_| writer.flush())
            .map_err(|e| {
                AgeGradeError::Configuration(format!("cannot write {}: {}", path.display(), e))
            })?;
        info!("wrote age grade cache {}", path.display());
        Ok(())
    }

    /// Load the table from a cache file.
    pub fn load_cache(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AgeGradeError::Configuration(format!(
                "age grade cache {} not found",
                path.display()
            )));
        }
        let blob = fs::read(path).map_err(|e| {
            AgeGradeError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let table = Self::build_from_cache(&blob).map_err(|e| match e {
            AgeGradeError::Configuration(message) => {
                AgeGradeError::Configuration(format!("{}: {}", path.display(), message))
            }
            other => other,
        })?;
        info!("loaded age grade cache {}", path.display());
        Ok(table)
    }

    /// Check that `source` holds a valid cache, then copy it to `destination`.
    pub fn install_cache(source: &Path, destination: &Path) -> Result<Self> {
        let table = Self::load_cache(source)?;
        fs::copy(source, destination).map_err(|e| {
            AgeGradeError::Configuration(format!(
                "cannot copy {} to {}: {}",
                source.display(),
                destination.display(),
                e
            ))
        })?;
        info!("installed age grade cache {}", destination.display());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::AgeGradeError, gender::Gender, table::tests::sample_table, AgeGradeTable};

    #[test]
    fn test_cache_bytes_round_trip() {
        let table = sample_table();
        let blob = table.to_cache_bytes().unwrap();
        let loaded = AgeGradeTable::build_from_cache(&blob).unwrap();
        assert_eq!(loaded, table);
        let a = table.age_grade(45, Gender::Female, 4.0, 1700.0).unwrap();
        let b = loaded.age_grade(45, Gender::Female, 4.0, 1700.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agegrade.json.gz");
        let table = sample_table();
        table.write_cache(&path).unwrap();
        assert_eq!(AgeGradeTable::load_cache(&path).unwrap(), table);
    }

    #[test]
    fn test_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let err = AgeGradeTable::load_cache(&dir.path().join("nope.json.gz")).unwrap_err();
        assert!(matches!(err, AgeGradeError::Configuration(_)));
    }

    #[test]
    fn test_corrupt_cache() {
        let err = AgeGradeTable::build_from_cache(b"not gzip at all").unwrap_err();
        assert!(matches!(err, AgeGradeError::Configuration(_)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agegrade.json.gz");
        std::fs::write(&path, b"\x1f\x8bgarbage").unwrap();
        let err = AgeGradeTable::load_cache(&path).unwrap_err();
        assert!(matches!(err, AgeGradeError::Configuration(ref m) if m.contains("agegrade.json.gz")));
    }

    #[test]
    fn test_install_rejects_invalid_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bad.json.gz");
        let destination = dir.path().join("agegrade.json.gz");
        std::fs::write(&source, b"junk").unwrap();
        assert!(AgeGradeTable::install_cache(&source, &destination).is_err());
        assert!(!destination.exists());
    }

    #[test]
    fn test_install_copies_valid_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("built.json.gz");
        let destination = dir.path().join("agegrade.json.gz");
        sample_table().write_cache(&source).unwrap();
        AgeGradeTable::install_cache(&source, &destination).unwrap();
        assert_eq!(AgeGradeTable::load_cache(&destination).unwrap(), sample_table());
    }
}
