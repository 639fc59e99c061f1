//! Property catalog.
//!
//! The archive root holds four levels of directories:
//! `facility/device/location/property`. Each leaf property directory holds
//! the monthly partition files of that property. The catalog is built by one
//! full walk and is read-only afterwards; a refresh is a new walk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::ArchiveError;
use crate::models::{MonthPartition, PropertyPath};

/// Number of directory levels between the root and a partition file.
const HIERARCHY_DEPTH: usize = 4;

/// Every property found under an archive root.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    entries: BTreeMap<PropertyPath, PathBuf>,
}

/// Walk `root` and collect every leaf property directory.
pub fn build_catalog(root: &Path) -> Result<Catalog, ArchiveError> {
    if !root.exists() {
        return Err(ArchiveError::Catalog {
            root: root.to_path_buf(),
            reason: "does not exist".to_string(),
        });
    }
    if !root.is_dir() {
        return Err(ArchiveError::Catalog {
            root: root.to_path_buf(),
            reason: "is not a directory".to_string(),
        });
    }

    let root = fs::canonicalize(root).map_err(|e| ArchiveError::Catalog {
        root: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut entries = BTreeMap::new();
    let mut segments = Vec::with_capacity(HIERARCHY_DEPTH);
    walk(&root, &mut segments, &mut entries);

    info!("Catalogued {} properties under {:?}", entries.len(), root);
    Ok(Catalog { root, entries })
}

fn walk(dir: &Path, segments: &mut Vec<String>, out: &mut BTreeMap<PropertyPath, PathBuf>) {
    for (name, path) in child_dirs(dir) {
        segments.push(name);
        if segments.len() == HIERARCHY_DEPTH {
            let property = PropertyPath::new(
                segments[0].clone(),
                segments[1].clone(),
                segments[2].clone(),
                segments[3].clone(),
            );
            out.insert(property, path);
        } else {
            walk(&path, segments, out);
        }
        segments.pop();
    }
}

/// Subdirectories of `dir`, sorted by name. Unreadable directories and
/// non-UTF-8 names are skipped.
fn child_dirs(dir: &Path) -> Vec<(String, PathBuf)> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) => {
            warn!("Skipping unreadable directory {:?}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut children: Vec<(String, PathBuf)> = read
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                None
            }
        })
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| match entry.file_name().into_string() {
            Ok(name) => Some((name, entry.path())),
            Err(raw) => {
                debug!("Skipping non UTF-8 directory name {:?} in {:?}", raw, dir);
                None
            }
        })
        .collect();

    children.sort();
    children
}

impl Catalog {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, property: &PropertyPath) -> bool {
        self.entries.contains_key(property)
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyPath> {
        self.entries.keys()
    }

    /// Canonical directory path -> display key.
    pub fn by_canonical(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(prop, dir)| (dir.to_string_lossy().into_owned(), prop.display_key()))
            .collect()
    }

    /// Display key -> canonical directory path.
    pub fn by_display(&self) -> BTreeMap<String, PathBuf> {
        self.entries
            .iter()
            .map(|(prop, dir)| (prop.display_key(), dir.clone()))
            .collect()
    }

    /// Directory of a known property.
    pub fn lookup(&self, property: &PropertyPath) -> Result<&Path, ArchiveError> {
        self.entries
            .get(property)
            .map(PathBuf::as_path)
            .ok_or_else(|| ArchiveError::UnknownProperty(property.display_key()))
    }

    /// Parse a display key and check that the property exists.
    pub fn resolve(&self, display_key: &str) -> Result<PropertyPath, ArchiveError> {
        let property: PropertyPath = display_key.parse()?;
        self.lookup(&property)?;
        Ok(property)
    }

    /// Properties whose display key contains every needle.
    pub fn filter(&self, needles: &[&str]) -> Vec<&PropertyPath> {
        self.entries
            .keys()
            .filter(|p| p.matches_all(needles))
            .collect()
    }

    /// Months that currently have a partition file for `property`.
    ///
    /// Files whose stem is not `YYYY-MM` are ignored.
    pub fn available_months(
        &self,
        property: &PropertyPath,
        extension: &str,
    ) -> Result<Vec<MonthPartition>, ArchiveError> {
        let dir = self.lookup(property)?;
        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            glob::Pattern::escape(extension)
        );

        let paths = glob::glob(&pattern).map_err(|e| ArchiveError::Catalog {
            root: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut months: Vec<MonthPartition> = paths
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .filter_map(|p| {
                p.file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse().ok())
            })
            .collect();

        months.sort();
        months.dedup();
        Ok(months)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn make_dirs(root: &Path, rel: &[&str]) {
        for r in rel {
            fs::create_dir_all(root.join(r)).unwrap();
        }
    }

    #[test]
    fn test_missing_root_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = build_catalog(&temp_dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ArchiveError::Catalog { .. }));
    }

    #[test]
    fn test_file_root_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("root.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            build_catalog(&file),
            Err(ArchiveError::Catalog { .. })
        ));
    }

    #[test]
    fn test_walks_four_levels() {
        let temp_dir = TempDir::new().unwrap();
        make_dirs(
            temp_dir.path(),
            &[
                "XFEL.SYNC/LASER.LOCK.XLO/XTIN.MLO1/CTRL0.OUT.MEAN.RD",
                "XFEL.SYNC/LASER.LOCK.XLO/XHEXP1.SLO1/CTRL0.OUT.MEAN.RD",
                "XFEL.SYNC/LINK.LOCK/XTIN.AMC8.ACTUATOR/FMC1.MD22.0.POSITION.RD",
            ],
        );

        let catalog = build_catalog(temp_dir.path()).unwrap();
        assert_eq!(catalog.len(), 3);

        let display: Vec<String> = catalog.by_display().into_keys().collect();
        assert_eq!(
            display,
            vec![
                "XFEL.SYNC/LASER.LOCK.XLO/XHEXP1.SLO1/CTRL0.OUT.MEAN.RD".to_string(),
                "XFEL.SYNC/LASER.LOCK.XLO/XTIN.MLO1/CTRL0.OUT.MEAN.RD".to_string(),
                "XFEL.SYNC/LINK.LOCK/XTIN.AMC8.ACTUATOR/FMC1.MD22.0.POSITION.RD".to_string(),
            ]
        );
    }

    #[test]
    fn test_shallow_branches_contribute_nothing() {
        let temp_dir = TempDir::new().unwrap();
        make_dirs(temp_dir.path(), &["A/B/C/D", "A/EMPTY", "X/Y/Z"]);
        fs::write(temp_dir.path().join("A/B/C/notes.txt"), "not a property").unwrap();

        let catalog = build_catalog(temp_dir.path()).unwrap();
        let keys: Vec<String> = catalog.properties().map(|p| p.display_key()).collect();
        assert_eq!(keys, vec!["A/B/C/D".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subtree_omitted() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        make_dirs(temp_dir.path(), &["A/B/C/D", "X/Y/Z/W"]);
        let locked = temp_dir.path().join("X/Y");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root ignores permission bits
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let catalog = build_catalog(temp_dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let keys: Vec<String> = catalog
            .unwrap()
            .properties()
            .map(|p| p.display_key())
            .collect();
        assert_eq!(keys, vec!["A/B/C/D".to_string()]);
    }

    #[test]
    fn test_canonical_keys_are_absolute_dirs() {
        let temp_dir = TempDir::new().unwrap();
        make_dirs(temp_dir.path(), &["A/B/C/D"]);

        let catalog = build_catalog(temp_dir.path()).unwrap();
        let by_canonical = catalog.by_canonical();
        let (canonical, display) = by_canonical.iter().next().unwrap();

        assert_eq!(display, "A/B/C/D");
        assert!(Path::new(canonical).is_absolute());
        assert!(Path::new(canonical).ends_with("A/B/C/D"));
    }

    #[test]
    fn test_lookup_unknown_property() {
        let temp_dir = TempDir::new().unwrap();
        make_dirs(temp_dir.path(), &["A/B/C/D"]);
        let catalog = build_catalog(temp_dir.path()).unwrap();

        assert!(catalog.resolve("A/B/C/D").is_ok());
        assert!(matches!(
            catalog.resolve("A/B/C/E"),
            Err(ArchiveError::UnknownProperty(_))
        ));
        assert!(matches!(
            catalog.resolve("A/B/C"),
            Err(ArchiveError::InvalidPropertyPath(_))
        ));
    }

    #[test]
    fn test_filter_by_substrings() {
        let temp_dir = TempDir::new().unwrap();
        make_dirs(
            temp_dir.path(),
            &[
                "XFEL.SYNC/LASER.LOCK.XLO/XTIN.MLO1/P1",
                "XFEL.SYNC/LINK.LOCK/XTIN.AMC8.ACTUATOR/P2",
                "XFEL.SYNC/LASER.LOCK.XLO/XHEXP1.SLO1/P3",
            ],
        );
        let catalog = build_catalog(temp_dir.path()).unwrap();

        let hits: Vec<String> = catalog
            .filter(&["XTIN", "LASER.LOCK.XLO"])
            .into_iter()
            .map(|p| p.property.clone())
            .collect();
        assert_eq!(hits, vec!["P1".to_string()]);
    }

    #[test]
    fn test_available_months() {
        let temp_dir = TempDir::new().unwrap();
        make_dirs(temp_dir.path(), &["A/B/C/D"]);
        let dir = temp_dir.path().join("A/B/C/D");
        fs::write(dir.join("2023-11.parquet"), b"").unwrap();
        fs::write(dir.join("2023-10.parquet"), b"").unwrap();
        fs::write(dir.join("summary.parquet"), b"").unwrap();
        fs::write(dir.join("2023-09.csv"), b"").unwrap();

        let catalog = build_catalog(temp_dir.path()).unwrap();
        let prop: PropertyPath = "A/B/C/D".parse().unwrap();
        let months: Vec<String> = catalog
            .available_months(&prop, "parquet")
            .unwrap()
            .iter()
            .map(|m| m.to_string())
            .collect();

        assert_eq!(months, vec!["2023-10".to_string(), "2023-11".to_string()]);
    }
}
