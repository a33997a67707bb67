//! Purpose: Default database path resolution for `load`.
//! Exports: `DEFAULT_DATABASE_NAME`, `default_database_path`.
//! Role: Keep the "database next to the CSV file" rule in one place.
//! Invariants: Only used when `--database` is absent.

use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_DATABASE_NAME: &str = "new_database.sq3";

pub(crate) fn default_database_path(csv_path: &Path) -> PathBuf {
    match csv_path.parent() {
        Some(dir) => dir.join(DEFAULT_DATABASE_NAME),
        None => PathBuf::from(DEFAULT_DATABASE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::default_database_path;
    use std::path::{Path, PathBuf};

    #[test]
    fn database_sits_next_to_csv() {
        assert_eq!(
            default_database_path(Path::new("/data/in/people.csv")),
            PathBuf::from("/data/in/new_database.sq3")
        );
        assert_eq!(
            default_database_path(Path::new("people.csv")),
            PathBuf::from("new_database.sq3")
        );
    }
}
