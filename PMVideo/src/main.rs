//! PMVideo terminal client: browse a media server and hand playback to an
//! external player.

mod app;
mod playback;

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::{LeaveAlternateScreen, disable_raw_mode};
use pmvconnect::{ClientIdentity, Connection, ServerLink};
use pmvcovers::CoverCache;
use pmvmodel::TreeModel;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::app::App;

fn main() -> Result<()> {
    // Restore the terminal even on panic, or the shell is left raw.
    std::panic::set_hook(Box::new(|panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        eprintln!("\n\nApplication panicked: {:?}", panic_info);
    }));

    init_tracing();

    let config = pmvconfig::get_config();

    let mut identity = ClientIdentity::new(config.get_client_id()?);
    identity.device_name = config.get_device_name();

    let mut conn = Connection::new(
        identity,
        config.get_server_host(),
        config.get_server_port(),
        config.get_token(),
    );
    conn.refresh()
        .with_context(|| format!("cannot reach server at {}", config.get_server_host()))?;
    info!(server = conn.name(), "connected");

    let conn = Arc::new(conn);
    let covers = CoverCache::new(config.get_cover_cache_dir()?);

    let model = TreeModel::connect(Arc::clone(&conn) as Arc<dyn ServerLink>)
        .context("cannot list library sections")?;

    let app = App::new(model, conn, covers, config)?;
    app::run(app)
}

fn init_tracing() {
    let _ = tracing_log::LogTracer::init();
    let writer = log_writer();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .try_init();
}

fn log_writer() -> BoxMakeWriter {
    if let Ok(path) = env::var("PMVIDEO_LOG_FILE") {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                let shared = SharedLogWriter::new(file);
                return BoxMakeWriter::new(move || shared.clone());
            }
            Err(err) => {
                eprintln!("Cannot open {path} for tracing logs: {err}. Falling back to stderr");
            }
        }
    }
    BoxMakeWriter::new(io::stderr)
}

#[derive(Clone)]
struct SharedLogWriter {
    inner: Arc<Mutex<File>>,
}

impl SharedLogWriter {
    fn new(file: File) -> Self {
        Self {
            inner: Arc::new(Mutex::new(file)),
        }
    }
}

impl Write for SharedLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
        guard.flush()
    }
}
