//! Building and installing the age-grade table cache.

use ag_table::{AgeGradeTable, Gender, Workbook};
use anyhow::Context;
use log::info;
use std::path::Path;

/// Parse the Men/Women sheets and write the cache.
pub fn run_table(men: &Path, women: &Path, cache: &Path) -> anyhow::Result<AgeGradeTable> {
    let workbook = Workbook::from_csv_files(men, women)?;
    let table = AgeGradeTable::build_from_source(&workbook)
        .with_context(|| format!("cannot build table from {} and {}", men.display(), women.display()))?;
    for gender in Gender::ALL {
        info!(
            "{}: {} distances",
            gender.sheet_name(),
            table.gender_table(gender).len()
        );
    }
    table.write_cache(cache)?;
    Ok(table)
}

/// Validate a cache built elsewhere and copy it into place.
pub fn run_install_cache(from: &Path, cache: &Path) -> anyhow::Result<AgeGradeTable> {
    AgeGradeTable::install_cache(from, cache)
        .with_context(|| format!("{} is not a usable age grade cache", from.display()))
}

pub fn load_table(cache: &Path) -> anyhow::Result<AgeGradeTable> {
    Ok(AgeGradeTable::load_cache(cache)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEN: &str = "dist(km),OC,30,40\n5.0,780,1.0,0.92\n10.0,1650,1.0,0.91\n";
    const WOMEN: &str = "dist(km),OC,30,40\n5.0,870,1.0,0.91\n10.0,1800,1.0,0.90\n";

    #[test]
    fn test_table_then_install() {
        let dir = tempfile::tempdir().unwrap();
        let men = dir.path().join("Men.csv");
        let women = dir.path().join("Women.csv");
        std::fs::write(&men, MEN).unwrap();
        std::fs::write(&women, WOMEN).unwrap();

        let built = dir.path().join("built.json.gz");
        let table = run_table(&men, &women, &built).unwrap();
        assert_eq!(load_table(&built).unwrap(), table);

        let installed = dir.path().join("agegrade.json.gz");
        run_install_cache(&built, &installed).unwrap();
        assert_eq!(load_table(&installed).unwrap(), table);
    }

    #[test]
    fn test_install_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = dir.path().join("garbage.json.gz");
        std::fs::write(&garbage, "{}").unwrap();
        assert!(run_install_cache(&garbage, &dir.path().join("cache.json.gz")).is_err());
        assert!(load_table(&dir.path().join("cache.json.gz")).is_err());
    }

    #[test]
    fn test_table_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures/agegrade");
        let cache = dir.path().join("agegrade.json.gz");
        let table = run_table(&fixtures.join("Men.csv"), &fixtures.join("Women.csv"), &cache).unwrap();
        assert_eq!(table.gender_table(Gender::Male).len(), 19);
    }
}
