//! Config persister: serializes a property surface to a newline delimited
//! text file (`name\nvalue\n`, blank line between entries) and loads the
//! same format back. Blank lines are tolerated between entries, but once
//! a name line has been read the very next line — even if blank — is
//! taken as its value.

use std::fs;
use std::path::Path;

use tracing::warn;

use super::property::PropertySurface;

/// Write every property in `surface` to `path` as `name\nvalue\n` pairs,
/// with a blank separator line before every entry but the first.
pub fn save(surface: &dyn PropertySurface, path: &Path) -> std::io::Result<()> {
    let mut out = String::new();
    for (i, (name, value)) in surface.enumerate_all().into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&name);
        out.push('\n');
        out.push_str(&value);
        out.push('\n');
    }
    fs::write(path, out)
}

/// Load `name\nvalue\n` pairs from `path` and apply them to `surface` via
/// `set`. Unknown or invalid entries are silently dropped: the file format
/// must survive property additions and removals across versions.
/// Returns the number of entries successfully applied.
pub fn load(surface: &dyn PropertySurface, path: &Path) -> std::io::Result<usize> {
    let text = fs::read_to_string(path)?;
    let mut applied = 0usize;
    let mut pending_name: Option<String> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim_end();
        match &pending_name {
            None => {
                if line.is_empty() {
                    // Blank line between entries: skip.
                    continue;
                }
                pending_name = Some(line.to_string());
            }
            Some(name) => {
                // The line immediately following a name is always its
                // value, blank or not.
                if let Err(e) = surface.set(name, line) {
                    warn!(property = %name, error = %e, "dropping unknown/invalid persisted property");
                } else {
                    applied += 1;
                }
                pending_name = None;
            }
        }
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::property::PropertyError;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    struct TestSurface {
        values: Mutex<BTreeMap<String, String>>,
    }

    impl PropertySurface for TestSurface {
        fn get(&self, name: &str) -> Result<String, PropertyError> {
            self.values
                .lock()
                .get(name)
                .cloned()
                .ok_or(PropertyError::UnknownProperty)
        }

        fn set(&self, name: &str, value: &str) -> Result<(), PropertyError> {
            let mut values = self.values.lock();
            if !values.contains_key(name) {
                return Err(PropertyError::UnknownProperty);
            }
            values.insert(name.to_string(), value.to_string());
            Ok(())
        }

        fn enumerate_all(&self) -> BTreeMap<String, String> {
            self.values.lock().clone()
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("camera.cfg");

        let mut initial = BTreeMap::new();
        initial.insert("brightness".to_string(), "50".to_string());
        initial.insert("title".to_string(), "front door".to_string());
        let source = TestSurface {
            values: Mutex::new(initial),
        };
        save(&source, &path).unwrap();

        let mut empty = BTreeMap::new();
        empty.insert("brightness".to_string(), String::new());
        empty.insert("title".to_string(), String::new());
        let target = TestSurface {
            values: Mutex::new(empty),
        };
        let applied = load(&target, &path).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(target.enumerate_all(), source.enumerate_all());
    }

    #[test]
    fn load_drops_unknown_properties_silently() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("camera.cfg");
        fs::write(&path, "brightness\n50\n\nnosuch\n1\n").unwrap();

        let mut initial = BTreeMap::new();
        initial.insert("brightness".to_string(), String::new());
        let target = TestSurface {
            values: Mutex::new(initial),
        };
        let applied = load(&target, &path).unwrap();
        assert_eq!(applied, 1);
        assert_eq!(target.get("brightness").unwrap(), "50");
    }

    #[test]
    fn blank_value_line_is_applied_not_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("camera.cfg");
        fs::write(&path, "title\n\n").unwrap();

        let mut initial = BTreeMap::new();
        initial.insert("title".to_string(), "stale".to_string());
        let target = TestSurface {
            values: Mutex::new(initial),
        };
        load(&target, &path).unwrap();
        assert_eq!(target.get("title").unwrap(), "");
    }
}
