use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use reqwest::Url;
use s3::{Bucket, Region, creds::Credentials};
use tracing::debug;

use super::{MediaError, UploadFolder};
use crate::config::StorageConfig;

const KEY_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const KEY_RANDOM_LEN: usize = 13;

/// An S3-compatible bucket seen through the two calls the app makes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), MediaError>;

    async fn delete(&self, key: &str) -> Result<(), MediaError>;

    fn urls(&self) -> &PublicUrls;
}

/// Maps keys to `https://<bucket>.<endpoint>/<key>` and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrls {
    bucket: String,
    endpoint: String,
}

impl PublicUrls {
    pub fn new(bucket: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            endpoint: endpoint.into(),
        }
    }

    fn host(&self) -> String {
        format!("{}.{}", self.bucket, self.endpoint)
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("https://{}/{}", self.host(), key)
    }

    /// Returns the object key if `url` points into this bucket.
    pub fn key_for(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        if url.scheme() != "https" || url.host_str()? != self.host() {
            return None;
        }
        let key = url.path().trim_start_matches('/');
        (!key.is_empty()).then(|| key.to_string())
    }
}

/// `<folder>/<random>_<timestamp>.<ext>` with 13 base-36 characters of
/// randomness and a millisecond timestamp.
pub fn object_key(folder: UploadFolder, extension: &str) -> String {
    let mut rng = rand::thread_rng();
    let random: String = (0..KEY_RANDOM_LEN)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
        .collect();
    format!(
        "{}/{}_{}.{}",
        folder,
        random,
        Utc::now().timestamp_millis(),
        extension
    )
}

/// Lower-cased extension of `file_name`, or `bin` when there is no usable one.
pub fn extension_from_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => "bin".to_string(),
    }
}

pub struct S3Store {
    bucket: Box<Bucket>,
    urls: PublicUrls,
}

impl S3Store {
    pub fn new(config: &StorageConfig) -> Result<Self, MediaError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: format!("https://{}", config.endpoint),
        };
        let credentials = Credentials::new(
            Some(&config.access_key_id),
            Some(&config.secret_access_key),
            None,
            None,
            None,
        )
        .map_err(|e| MediaError::Storage(e.to_string()))?;
        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| MediaError::Storage(e.to_string()))?;

        Ok(Self {
            bucket,
            urls: PublicUrls::new(&config.bucket, &config.endpoint),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), MediaError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &bytes, content_type)
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(MediaError::Storage(format!(
                "PUT {key} returned status {status}"
            )));
        }
        debug!(%key, status, "object stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), MediaError> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(MediaError::Storage(format!(
                "DELETE {key} returned status {status}"
            )));
        }
        debug!(%key, status, "object deleted");
        Ok(())
    }

    fn urls(&self) -> &PublicUrls {
        &self.urls
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Bucket stand-in for tests. `failing` makes every call error.
    pub(crate) struct MemoryStore {
        pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
        pub failing: bool,
        urls: PublicUrls,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self {
                objects: Mutex::new(HashMap::new()),
                failing: false,
                urls: PublicUrls::new("media", "s3.example.com"),
            }
        }

        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn put(
            &self,
            key: &str,
            bytes: Vec<u8>,
            content_type: &str,
        ) -> Result<(), MediaError> {
            if self.failing {
                return Err(MediaError::Storage("bucket unreachable".into()));
            }
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), (bytes, content_type.to_string()));
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), MediaError> {
            if self.failing {
                return Err(MediaError::Storage("bucket unreachable".into()));
            }
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }

        fn urls(&self) -> &PublicUrls {
            &self.urls
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn key_has_folder_random_part_and_timestamp() {
        let key = object_key(UploadFolder::Events, "jpg");
        let (folder, name) = key.split_once('/').unwrap();
        assert_eq!(folder, "events");

        let (stem, ext) = name.rsplit_once('.').unwrap();
        assert_eq!(ext, "jpg");
        let (random, timestamp) = stem.split_once('_').unwrap();
        assert_eq!(random.len(), 13);
        assert!(random.bytes().all(|b| KEY_ALPHABET.contains(&b)));
        assert!(timestamp.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn ten_thousand_keys_never_collide() {
        let keys: HashSet<String> = (0..10_000)
            .map(|_| object_key(UploadFolder::Gallery, "png"))
            .collect();
        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn public_url_round_trips_to_key() {
        let urls = PublicUrls::new("stlouis-media", "s3.us-east-005.backblazeb2.com");
        let url = urls.url_for("events/abc_1.jpg");
        assert_eq!(
            url,
            "https://stlouis-media.s3.us-east-005.backblazeb2.com/events/abc_1.jpg"
        );
        assert_eq!(urls.key_for(&url).as_deref(), Some("events/abc_1.jpg"));
    }

    #[test]
    fn foreign_urls_have_no_key() {
        let urls = PublicUrls::new("stlouis-media", "s3.us-east-005.backblazeb2.com");
        assert_eq!(urls.key_for("https://evil.example.com/events/a.jpg"), None);
        assert_eq!(
            urls.key_for("http://stlouis-media.s3.us-east-005.backblazeb2.com/events/a.jpg"),
            None
        );
        assert_eq!(
            urls.key_for("https://stlouis-media.s3.us-east-005.backblazeb2.com/"),
            None
        );
        assert_eq!(urls.key_for("not a url"), None);
    }

    #[test]
    fn extension_comes_from_file_name() {
        assert_eq!(extension_from_name("photo.JPEG"), "jpeg");
        assert_eq!(extension_from_name("archive.tar.gz"), "gz");
        assert_eq!(extension_from_name("README"), "bin");
        assert_eq!(extension_from_name("weird.p/ng"), "bin");
        assert_eq!(extension_from_name("trailing."), "bin");
    }
}
