//! Format choice and playback hand-off.

use std::process::Command;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use pmvconnect::{Connection, TranscodeSession};
use pmvlibrary::{LibraryItem, Media, Video};
use pmvmodel::{NodeId, TreeModel};
use tracing::{info, warn};

/// Heights above this stream through a transcode session.
const TRANSCODE_HEIGHT: u64 = 750;

/// Scores one rendition for direct playback.
///
/// Penalizes resolutions outside the comfortable window, rules out
/// multi-part renditions, nudges mkv up. Zero or below means unplayable.
fn score(format: &Media) -> Result<i64> {
    let mut score = 1000i64;
    let height = format.height()?;
    if height > 800 {
        score -= 100;
    } else if height < 480 {
        score -= 100;
    }
    if format.parts().len() != 1 {
        score -= 1000;
    }
    if format.container_format().as_deref() == Some("mkv") {
        score += 10;
    }
    Ok(score)
}

/// Best-scored format; document order breaks ties.
fn choose_format(video: &Video) -> Result<Option<Media>> {
    let mut best: Option<Media> = None;
    let mut best_score = 0i64;
    for format in video.formats() {
        let score = score(&format)?;
        if score > best_score {
            best_score = score;
            best = Some(format);
        }
    }
    Ok(best)
}

/// Plays the video at `node` through the external player, blocking until
/// the player exits. Returns a status line for the UI.
pub fn play(
    model: &mut TreeModel,
    node: NodeId,
    conn: &Arc<Connection>,
    player: &str,
    force_transcode: bool,
) -> Result<String> {
    let Some(video) = model.video(node) else {
        return Ok("Not a video".to_owned());
    };
    let title = video.title();
    let duration_ms = video.duration_ms()?.unwrap_or(0);

    let Some(format) = choose_format(video)? else {
        return Ok(format!("Cannot play '{}': no suitable format", title));
    };

    let mut session = None;
    let stream_url = if format.height()? > TRANSCODE_HEIGHT || force_transcode {
        let Some(metadata_path) = video.metadata_path() else {
            return Ok(format!("Cannot play '{}': item has no key", title));
        };
        let ts = TranscodeSession::for_item(Arc::clone(conn), &metadata_path)
            .option("protocol", "http")
            .option("videoResolution", "720")
            .option("fastSeek", "1")
            .option("directPlay", "0");
        info!(session = %ts.session_id(), "new transcode session");
        let url = ts.start_url();
        session = Some(ts);
        url
    } else {
        let parts = format.parts();
        match parts.first().and_then(|part| part.stream_url()) {
            Some(url) => url,
            None => return Ok(format!("Cannot play '{}': part has no path", title)),
        }
    };

    info!(title = %title, url = %stream_url, "handing off to player");
    let started = Instant::now();
    let status = Command::new(player)
        .arg(&stream_url)
        .status()
        .with_context(|| format!("cannot launch player '{player}'"))?;
    if !status.success() {
        warn!(code = ?status.code(), "player exited abnormally");
    }

    if let Some(ts) = session {
        if let Err(err) = ts.stop() {
            warn!(error = %err, "could not stop transcode session");
        }
    }

    // Half of the runtime counts as watched, mirroring the server's own
    // scrobble convention.
    let watched = duration_ms > 0 && started.elapsed().as_millis() as u64 >= duration_ms / 2;
    if watched {
        if let Some(video) = model.video_mut(node) {
            if let Err(err) = video.mark_watched() {
                warn!(error = %err, "could not mark watched");
            }
        }
    }

    Ok(format!(
        "Finished watching '{}'{}",
        title,
        if watched { " (marked watched)" } else { "" }
    ))
}
