//! # ep-storage-local
//! event-pocket/crates/ep-plugins/ep-storage-local/src/lib.rs
//! Local filesystem implementation of `MediaStore`.
//! Files land under a sharded directory tree and are served back by the
//! binary under a public URL prefix.

use std::path::PathBuf;

use async_trait::async_trait;
use ep_core::traits::MediaStore;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/media")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

/// The extension comes from the validated content type, never from the
/// client's file name, so the static file server answers with the same type.
fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("bin"),
    }
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Generates a sharded key: "ab/cd/abcdef....ext"
    fn new_key(content_type: &str) -> String {
        let name = Uuid::new_v4().simple().to_string();
        format!(
            "{}/{}/{}.{}",
            &name[0..2],
            &name[2..4],
            name,
            extension_for(content_type)
        )
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Writes the bytes under a fresh random name. Never overwrites.
    async fn save_upload(
        &self,
        data: bytes::Bytes,
        content_type: &str,
        file_name: Option<String>,
    ) -> anyhow::Result<String> {
        let key = Self::new_key(content_type);
        let target_path = self.root_path.join(&key);
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target_path)
            .await?;
        file.write_all(&data).await?;
        file.flush().await?;

        debug!(%key, original = file_name.as_deref().unwrap_or("-"), "upload written");
        Ok(key)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_under_sharded_key_with_typed_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media/".into());

        let key = store
            .save_upload(bytes::Bytes::from_static(b"GIF89a"), "image/gif", Some("cat.html".into()))
            .await
            .unwrap();

        assert!(key.ends_with(".gif"));
        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[2].starts_with(&format!("{}{}", parts[0], parts[1])));
        assert_eq!(std::fs::read(dir.path().join(&key)).unwrap(), b"GIF89a");
        assert_eq!(store.public_url(&key), format!("/media/{key}"));
    }

    #[tokio::test]
    async fn each_upload_gets_a_distinct_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "https://cdn.example.org/m".into());
        let a = store.save_upload(bytes::Bytes::from_static(b"x"), "video/mp4", None).await.unwrap();
        let b = store.save_upload(bytes::Bytes::from_static(b"x"), "video/mp4", None).await.unwrap();
        assert_ne!(a, b);
        assert!(store.public_url(&a).starts_with("https://cdn.example.org/m/"));
    }

    #[test]
    fn quicktime_maps_to_mov() {
        assert_eq!(extension_for("video/quicktime"), "mov");
        assert_eq!(extension_for("image/JPEG; q=1"), "jpg");
        assert_eq!(extension_for("application/x-unknown-thing"), "bin");
    }
}
