#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use wpbackup_core::storage::object_key;
use wpbackup_core::{Error, ObjectStore, Result, Settings};

/// Helper function to initialize the tracing subscriber for tests.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// In-memory bucket that records every call made against it.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub objects: RefCell<BTreeMap<String, Vec<u8>>>,
    pub uploads: RefCell<Vec<String>>,
    pub deletes: RefCell<Vec<String>>,
    pub fail_uploads: bool,
}

impl RecordingStore {
    pub fn with_keys<I: IntoIterator<Item = S>, S: Into<String>>(keys: I) -> Self {
        let store = Self::default();
        for key in keys {
            store.objects.borrow_mut().insert(key.into(), Vec::new());
        }
        store
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.borrow().keys().cloned().collect()
    }
}

impl ObjectStore for RecordingStore {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.keys())
    }

    fn upload(&self, file: &Path) -> Result<String> {
        if self.fail_uploads {
            return Err(Error::Storage {
                operation: "upload",
                message: "access denied".to_string(),
            });
        }
        let key = object_key(file)?;
        let bytes = fs::read(file)?;
        self.objects.borrow_mut().insert(key.clone(), bytes);
        self.uploads.borrow_mut().push(key.clone());
        Ok(key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.objects.borrow_mut().remove(key);
        self.deletes.borrow_mut().push(key.to_string());
        Ok(())
    }
}

pub fn wp_config_php(database: &str, user: &str, password: &str, host: &str) -> String {
    format!(
        "<?php\n\
         /** The name of the database for WordPress */\n\
         define( 'DB_NAME', '{database}' );\n\
         define( 'DB_USER', '{user}' );\n\
         define( 'DB_PASSWORD', '{password}' );\n\
         define( 'DB_HOST', '{host}' );\n\
         define( 'DB_CHARSET', 'utf8mb4' );\n\
         $table_prefix = 'wp_';\n\
         require_once ABSPATH . 'wp-settings.php';\n"
    )
}

/// Creates `<root>/<name>` with a `wp-config.php` and a few content files.
pub fn create_site(root: &Path, name: &str) -> PathBuf {
    let site = root.join(name);
    fs::create_dir_all(site.join("wp-content/uploads")).unwrap();
    fs::write(site.join("wp-config.php"), wp_config_php("wp_db", "wp_user", "s3cret", "localhost")).unwrap();
    fs::write(site.join("index.php"), "<?php require __DIR__ . '/wp-blog-header.php';\n").unwrap();
    fs::write(site.join("wp-content/uploads/photo.jpg"), [0xffu8, 0xd8, 0xff, 0xe0]).unwrap();
    site
}

/// Writes an executable shell script standing in for `mysqldump`.
#[cfg(unix)]
pub fn fake_dump_command(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-mysqldump");
    fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

/// Dump script that prints its arguments as an SQL comment.
pub const ECHO_DUMP: &str = "echo \"-- mysqldump $*\"\necho \"CREATE TABLE wp_posts (ID int);\"";

/// Helper function to set up a test environment: a temp root with one site and settings pointing at it.
#[cfg(unix)]
pub fn setup_test_env() -> (tempfile::TempDir, Settings, PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let site = create_site(temp_dir.path(), "mysite");
    let dump = fake_dump_command(temp_dir.path(), ECHO_DUMP);

    let settings = Settings {
        backup_dir: temp_dir.path().join("scratch"),
        dump_command: dump.to_string_lossy().into_owned(),
        ..Default::default()
    };

    (temp_dir, settings, site)
}
