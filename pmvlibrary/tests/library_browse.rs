//! Browsing behavior over a scripted server: no network involved.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use pmvconnect::{ConnectionError, ServerLink};
use pmvlibrary::{Item, LibraryError, LibraryItem, sections};
use xmltree::Element;

/// Scripted stand-in for a media server: canned XML per path, call logs,
/// and a switchable ping failure mode.
struct FakeServer {
    name: String,
    responses: HashMap<String, String>,
    fetch_log: Mutex<Vec<String>>,
    ping_log: Mutex<Vec<String>>,
    fail_pings: AtomicBool,
}

impl FakeServer {
    fn new(responses: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            name: "fake".to_owned(),
            responses: responses
                .iter()
                .map(|(path, xml)| (path.to_string(), xml.to_string()))
                .collect(),
            fetch_log: Mutex::new(Vec::new()),
            ping_log: Mutex::new(Vec::new()),
            fail_pings: AtomicBool::new(false),
        })
    }

    fn fetches(&self) -> Vec<String> {
        self.fetch_log.lock().unwrap().clone()
    }

    fn pings(&self) -> Vec<String> {
        self.ping_log.lock().unwrap().clone()
    }
}

impl ServerLink for FakeServer {
    fn identity_name(&self) -> &str {
        &self.name
    }

    fn fetch_node(&self, path: &str) -> Result<Element, ConnectionError> {
        self.fetch_log.lock().unwrap().push(path.to_owned());
        let xml = self
            .responses
            .get(path)
            .ok_or_else(|| ConnectionError::InvalidResponse {
                host: self.name.clone(),
                path: path.to_owned(),
                status: 404,
            })?;
        Element::parse(xml.as_bytes()).map_err(|err| ConnectionError::InvalidPayload {
            path: path.to_owned(),
            message: err.to_string(),
        })
    }

    fn ping(&self, path: &str) -> Result<(), ConnectionError> {
        self.ping_log.lock().unwrap().push(path.to_owned());
        if self.fail_pings.load(Ordering::SeqCst) {
            Err(ConnectionError::Offline {
                host: self.name.clone(),
                message: "scripted failure".to_owned(),
            })
        } else {
            Ok(())
        }
    }

    fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, ConnectionError> {
        Err(ConnectionError::InvalidResponse {
            host: self.name.clone(),
            path: path.to_owned(),
            status: 404,
        })
    }

    fn absolute_url(&self, path: &str) -> String {
        format!("http://fake:32400{}", path)
    }
}

fn directory(attrs: &str) -> Element {
    Element::parse(format!("<Directory {attrs}/>").as_bytes()).unwrap()
}

#[test]
fn kind_tag_dispatch() {
    let server = FakeServer::new(&[]);
    let link: Arc<dyn ServerLink> = server;

    let dir = Item::wrap(Arc::clone(&link), directory(r#"key="1" title="Shows""#)).unwrap();
    assert!(dir.is_container());

    let video = Element::parse(br#"<Video ratingKey="9" title="Pilot"/>"#.as_slice()).unwrap();
    let video = Item::wrap(Arc::clone(&link), video).unwrap();
    assert!(video.as_video().is_some());

    let photo = Element::parse(br#"<Photo key="3"/>"#.as_slice()).unwrap();
    match Item::wrap(link, photo) {
        Err(LibraryError::UnknownEntityKind(kind)) => assert_eq!(kind, "Photo"),
        other => panic!("expected UnknownEntityKind, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn declared_count_wins_over_enumeration() {
    // Three actual children but a declared count of five: the declaration
    // is authoritative and no listing fetch happens for the count.
    let server = FakeServer::new(&[(
        "/library/metadata/1/children",
        r#"<MediaContainer>
             <Video ratingKey="10" title="a"/>
             <Video ratingKey="11" title="b"/>
             <Video ratingKey="12" title="c"/>
           </MediaContainer>"#,
    )]);
    let link: Arc<dyn ServerLink> = Arc::clone(&server) as Arc<dyn ServerLink>;

    let node = directory(r#"key="/library/metadata/1/children" childCount="5" title="Show""#);
    let show = match Item::wrap(link, node).unwrap() {
        Item::Container(c) => c,
        Item::Video(_) => unreachable!(),
    };

    assert_eq!(show.size().unwrap(), 5);
    assert!(server.fetches().is_empty());
    assert!(show.has_child_hint().unwrap());
}

#[test]
fn undeclared_count_is_a_single_lazy_enumeration() {
    let server = FakeServer::new(&[(
        "/library/metadata/1/children",
        r#"<MediaContainer>
             <Video ratingKey="10" title="a"/>
             <Video ratingKey="11" title="b"/>
           </MediaContainer>"#,
    )]);
    let link: Arc<dyn ServerLink> = Arc::clone(&server) as Arc<dyn ServerLink>;

    let node = directory(r#"key="/library/metadata/1/children" title="Show""#);
    let show = match Item::wrap(link, node).unwrap() {
        Item::Container(c) => c,
        Item::Video(_) => unreachable!(),
    };

    assert_eq!(show.size().unwrap(), 2);
    assert_eq!(show.size().unwrap(), 2);
    assert!(show.child_at(0).unwrap().is_some());
    assert!(show.child_at(2).unwrap().is_none());
    // One fetch total across size + random access.
    assert_eq!(server.fetches().len(), 1);
}

#[test]
fn browse_sections_down_to_parts() {
    let server = FakeServer::new(&[
        (
            "/library/sections",
            r#"<MediaContainer>
                 <Directory key="2" title="TV Shows" type="show"/>
               </MediaContainer>"#,
        ),
        (
            "/library/sections/2/all",
            r#"<MediaContainer>
                 <Directory key="/library/metadata/5/children" childCount="2" title="Some Show"/>
               </MediaContainer>"#,
        ),
        (
            "/library/metadata/5/children",
            r#"<MediaContainer>
                 <Video ratingKey="50" title="Ep 1" viewCount="1">
                   <Media id="70" container="mkv" height="720" width="1280">
                     <Part id="80" key="/library/parts/80/file.mkv" file="/mnt/ep1.mkv" size="1024"/>
                   </Media>
                 </Video>
                 <Video ratingKey="51" title="Ep 2"/>
               </MediaContainer>"#,
        ),
    ]);
    let link: Arc<dyn ServerLink> = Arc::clone(&server) as Arc<dyn ServerLink>;

    let sections = sections(&link).unwrap();
    assert_eq!(sections.len(), 1);
    let section = &sections[0];
    assert_eq!(section.title(), "TV Shows");
    assert_eq!(section.size().unwrap(), 1);

    let show = match section.child_at(0).unwrap().unwrap() {
        Item::Container(c) => c,
        Item::Video(_) => unreachable!(),
    };
    assert_eq!(show.size().unwrap(), 2);
    // Normalized from the children path.
    assert_eq!(show.key().unwrap(), "5");

    let ep1 = show.child_at(0).unwrap().unwrap();
    let ep2 = show.child_at(1).unwrap().unwrap();
    let (ep1, ep2) = (ep1.as_video().unwrap(), ep2.as_video().unwrap());
    assert_ne!(ep1.key(), ep2.key());

    let formats = ep1.formats();
    assert_eq!(formats.len(), 1);
    assert_eq!(formats[0].container_format().as_deref(), Some("mkv"));
    assert_eq!(formats[0].height().unwrap(), 720);

    let parts = formats[0].parts();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].fs_path().as_deref(), Some("/mnt/ep1.mkv"));
    assert_eq!(
        parts[0].stream_path().as_deref(),
        Some("/library/parts/80/file.mkv")
    );
    assert_eq!(
        parts[0].stream_url().as_deref(),
        Some("http://fake:32400/library/parts/80/file.mkv")
    );
}

#[test]
fn watched_state_moves_only_after_the_server_confirmed() {
    let server = FakeServer::new(&[]);
    let link: Arc<dyn ServerLink> = Arc::clone(&server) as Arc<dyn ServerLink>;

    let node = Element::parse(br#"<Video ratingKey="42" viewCount="3"/>"#.as_slice()).unwrap();
    let mut video = match Item::wrap(link, node).unwrap() {
        Item::Video(v) => v,
        Item::Container(_) => unreachable!(),
    };

    server.fail_pings.store(true, Ordering::SeqCst);
    let err = video.mark_watched().unwrap_err();
    assert!(matches!(err, LibraryError::Remote(_)));
    assert_eq!(video.views().unwrap(), 3);

    server.fail_pings.store(false, Ordering::SeqCst);
    video.mark_watched().unwrap();
    assert_eq!(video.views().unwrap(), 4);
    assert_eq!(
        server.pings().last().map(String::as_str),
        Some("/:/scrobble?key=42&identifier=com.plexapp.plugins.library")
    );

    video.mark_unwatched().unwrap();
    assert_eq!(video.views().unwrap(), 0);
    assert_eq!(
        server.pings().last().map(String::as_str),
        Some("/:/unscrobble?key=42&identifier=com.plexapp.plugins.library")
    );
}
