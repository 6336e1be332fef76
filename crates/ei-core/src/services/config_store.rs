use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::AsyncWriteExt;

use crate::error::{InstallerError, Result};
use crate::models::field::is_secret;

static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_]*)=(.*)$").unwrap()
});

const REDACTED: &str = "********";

#[derive(Debug, Clone)]
enum Line {
    /// A `KEY=VALUE` pair. `raw` holds the original text until the value changes.
    Entry {
        key: String,
        value: String,
        raw: Option<String>,
    },
    /// Blank lines, comments and anything unparseable, kept as written.
    Verbatim(String),
}

/// Flat `KEY=VALUE` file that keeps line order and untouched lines across rewrites.
/// Every mutation is written to disk before it returns.
pub struct ConfigStore {
    path: PathBuf,
    lines: Vec<Line>,
}

impl ConfigStore {
    /// Read the store at `path`. A missing file is an empty store.
    pub async fn load(path: &Path) -> Result<Self> {
        let mut store = Self {
            path: path.to_path_buf(),
            lines: Vec::new(),
        };
        if !path.exists() {
            return Ok(store);
        }
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            InstallerError::StoreUnreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        store.lines = parse(&contents);
        tracing::debug!(path = %path.display(), entries = store.len(), "config_store_loaded");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value for `key`, or `None` when the key is missing or empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entry_value(key).filter(|v| !v.is_empty())
    }

    /// Replace `key` in place, or append it, then persist.
    pub async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value: String = value.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        match self.position(key) {
            Some(index) => {
                self.lines[index] = Line::Entry {
                    key: key.to_string(),
                    value,
                    raw: None,
                };
            }
            None => self.lines.push(Line::Entry {
                key: key.to_string(),
                value,
                raw: None,
            }),
        }
        tracing::debug!(key, "config_value_set");
        self.persist().await
    }

    /// Write `value` only when `key` is missing or empty. Returns whether it wrote.
    pub async fn set_default_if_absent(&mut self, key: &str, value: &str) -> Result<bool> {
        if self.get(key).is_some() {
            return Ok(false);
        }
        self.set(key, value).await?;
        Ok(true)
    }

    /// All entries in file order, including empty values.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Entry { key, value, .. } => Some((key.as_str(), value.as_str())),
                Line::Verbatim(_) => None,
            })
            .collect()
    }

    /// Entries in file order with secret values masked, for display.
    pub fn redacted_entries(&self) -> Vec<(String, String)> {
        self.entries()
            .into_iter()
            .map(|(key, value)| {
                let shown = if is_secret(key) && !value.is_empty() {
                    REDACTED.to_string()
                } else {
                    value.to_string()
                };
                (key.to_string(), shown)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| matches!(line, Line::Entry { key: k, .. } if k == key))
    }

    fn entry_value(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Entry { raw: Some(raw), .. } => out.push_str(raw),
                Line::Entry { key, value, raw: None } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
                Line::Verbatim(text) => out.push_str(text),
            }
            out.push('\n');
        }
        out
    }

    /// Write to a sibling file and rename it over the store.
    async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp_path = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        file.write_all(self.render().as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

fn parse(contents: &str) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for text in contents.lines() {
        let Some(caps) = ENTRY_RE.captures(text) else {
            lines.push(Line::Verbatim(text.to_string()));
            continue;
        };
        let key = caps[1].to_string();
        let value = caps[2].to_string();
        if let Some(&index) = seen.get(&key) {
            tracing::warn!(key = %key, "duplicate_config_key");
            lines[index] = Line::Entry {
                key,
                value,
                raw: None,
            };
            continue;
        }
        seen.insert(key.clone(), lines.len());
        lines.push(Line::Entry {
            key,
            value,
            raw: Some(text.to_string()),
        });
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with(contents: &str) -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        tokio::fs::write(&path, contents).await.unwrap();
        let store = ConfigStore::load(&path).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn load_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(&dir.path().join(".env")).await.unwrap();
        assert!(store.is_empty());
        assert!(!dir.path().join(".env").exists());
    }

    #[tokio::test]
    async fn set_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".env");
        let mut store = ConfigStore::load(&path).await.unwrap();
        store.set("DB_HOST", "db.internal").await.unwrap();
        store.set("DB_HOST", "db2.internal").await.unwrap();
        store.set("PORT", "3000").await.unwrap();

        let reloaded = ConfigStore::load(&path).await.unwrap();
        assert_eq!(reloaded.get("DB_HOST"), Some("db2.internal"));
        assert_eq!(reloaded.get("PORT"), Some("3000"));
        assert_eq!(reloaded.len(), 2);
    }

    #[tokio::test]
    async fn set_existing_key_keeps_position_and_count() {
        let (_dir, mut store) = store_with("A=1\nB=2\nC=3\n").await;
        store.set("B", "20").await.unwrap();
        assert_eq!(store.entries(), vec![("A", "1"), ("B", "20"), ("C", "3")]);

        store.set("D", "4").await.unwrap();
        assert_eq!(store.entries().last(), Some(&("D", "4")));
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn default_does_not_overwrite() {
        let (_dir, mut store) = store_with("PORT=8080\nDB_HOST=db\n").await;
        assert!(!store.set_default_if_absent("PORT", "3000").await.unwrap());
        assert_eq!(store.entries(), vec![("PORT", "8080"), ("DB_HOST", "db")]);

        assert!(store.set_default_if_absent("DB_PORT", "5432").await.unwrap());
        assert_eq!(store.get("DB_PORT"), Some("5432"));
    }

    #[tokio::test]
    async fn empty_value_reads_as_unset() {
        let (_dir, mut store) = store_with("SMTP_ADDRESS=\n").await;
        assert_eq!(store.get("SMTP_ADDRESS"), None);
        assert_eq!(store.get("MISSING"), None);

        assert!(store
            .set_default_if_absent("SMTP_ADDRESS", "smtp.local")
            .await
            .unwrap());
        assert_eq!(store.entries(), vec![("SMTP_ADDRESS", "smtp.local")]);
    }

    #[tokio::test]
    async fn comments_and_malformed_lines_survive_rewrite() {
        let original = "# Enterprise settings\nexport APP_HOST=example.com\n\nnot a pair\nDB_HOST=old\n";
        let (dir, mut store) = store_with(original).await;
        store.set("DB_HOST", "new").await.unwrap();

        let written = tokio::fs::read_to_string(dir.path().join(".env"))
            .await
            .unwrap();
        assert_eq!(
            written,
            "# Enterprise settings\nexport APP_HOST=example.com\n\nnot a pair\nDB_HOST=new\n"
        );
        assert_eq!(store.get("APP_HOST"), Some("example.com"));
    }

    #[tokio::test]
    async fn values_are_literal() {
        let (_dir, store) = store_with("DATABASE_URL=postgres://u:p@h/db?x=1\nQUOTED=\"a b\"\n").await;
        assert_eq!(store.get("DATABASE_URL"), Some("postgres://u:p@h/db?x=1"));
        assert_eq!(store.get("QUOTED"), Some("\"a b\""));
    }

    #[tokio::test]
    async fn duplicate_keys_merge_into_first_position() {
        let (dir, mut store) = store_with("A=1\nB=2\nA=3\n").await;
        assert_eq!(store.entries(), vec![("A", "3"), ("B", "2")]);

        store.set("B", "5").await.unwrap();
        let written = tokio::fs::read_to_string(dir.path().join(".env"))
            .await
            .unwrap();
        assert_eq!(written, "A=3\nB=5\n");
    }

    #[tokio::test]
    async fn newlines_in_values_are_stripped() {
        let (_dir, mut store) = store_with("").await;
        store.set("APP_HOST", "example.com\r\nINJECTED=1").await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("APP_HOST"), Some("example.comINJECTED=1"));
    }

    #[tokio::test]
    async fn non_utf8_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        tokio::fs::write(&path, [0x41, 0x3d, 0xff, 0xfe]).await.unwrap();
        assert!(matches!(
            ConfigStore::load(&path).await,
            Err(InstallerError::StoreUnreadable { .. })
        ));
    }

    #[tokio::test]
    async fn secrets_are_redacted_for_display() {
        let (_dir, store) = store_with("DB_HOST=db\nDB_PASSWORD=hunter2\nSMTP_PASSWORD=\n").await;
        assert_eq!(
            store.redacted_entries(),
            vec![
                ("DB_HOST".to_string(), "db".to_string()),
                ("DB_PASSWORD".to_string(), "********".to_string()),
                ("SMTP_PASSWORD".to_string(), String::new()),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn persisted_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (dir, mut store) = store_with("").await;
        store.set("LICENSE_KEY", "abc").await.unwrap();
        let mode = std::fs::metadata(dir.path().join(".env"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!dir.path().join(".env.tmp").exists());
    }
}
