use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use pmvconnect::{ConnectionError, ServerLink};
use pmvcovers::CoverCache;
use xmltree::Element;

struct ByteServer {
    name: String,
    payload: Vec<u8>,
    fetches: AtomicUsize,
    fail: Mutex<bool>,
}

impl ByteServer {
    fn new(name: &str, payload: &[u8]) -> Self {
        Self {
            name: name.to_owned(),
            payload: payload.to_vec(),
            fetches: AtomicUsize::new(0),
            fail: Mutex::new(false),
        }
    }
}

impl ServerLink for ByteServer {
    fn identity_name(&self) -> &str {
        &self.name
    }

    fn fetch_node(&self, path: &str) -> Result<Element, ConnectionError> {
        Err(ConnectionError::InvalidResponse {
            host: self.name.clone(),
            path: path.to_owned(),
            status: 404,
        })
    }

    fn ping(&self, _path: &str) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, ConnectionError> {
        if *self.fail.lock().unwrap() {
            return Err(ConnectionError::Offline {
                host: self.name.clone(),
                message: "scripted failure".to_owned(),
            });
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let _ = path;
        Ok(self.payload.clone())
    }

    fn absolute_url(&self, path: &str) -> String {
        format!("http://fake:32400{}", path)
    }
}

#[test]
fn miss_downloads_once_then_serves_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CoverCache::new(dir.path());
    let server = ByteServer::new("livingroom", b"jpeg bytes");

    let first = cache
        .fetch(&server, "/library/metadata/5/thumb/99")
        .unwrap();
    let second = cache
        .fetch(&server, "/library/metadata/5/thumb/99")
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(server.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(std::fs::read(&first).unwrap(), b"jpeg bytes");
}

#[test]
fn separator_substitution_keeps_paths_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CoverCache::new(dir.path());

    let a = cache.cached_path("srv", "/library/metadata/5/thumb");
    let b = cache.cached_path("srv", "/library/metadata/5+thumb");
    assert_ne!(a, b);
    assert!(
        a.file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("+library+metadata+5")
    );
}

#[test]
fn failed_download_leaves_no_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CoverCache::new(dir.path());
    let server = ByteServer::new("srv", b"unused");
    *server.fail.lock().unwrap() = true;

    assert!(cache.fetch(&server, "/thumb/1").is_err());
    assert!(!cache.cached_path("srv", "/thumb/1").exists());
}

#[test]
fn clear_server_forgets_cached_covers() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CoverCache::new(dir.path());
    let server = ByteServer::new("srv", b"bytes");

    cache.fetch(&server, "/thumb/1").unwrap();
    cache.clear_server("srv").unwrap();

    assert!(!cache.cached_path("srv", "/thumb/1").exists());
    cache.fetch(&server, "/thumb/1").unwrap();
    assert_eq!(server.fetches.load(Ordering::SeqCst), 2);
}
