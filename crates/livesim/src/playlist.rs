use std::{fmt::Write as _, path::Path};

use m3u8_rs::{MasterPlaylist, MediaPlaylist, Playlist};

use crate::error::{LiveSimError, LiveSimResult};

/// Content type of every rendered playlist.
pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// A decoded playlist file.
#[derive(Debug, Clone)]
pub enum PlaylistSource {
    /// Flat segment list, drives the live simulation.
    Media(MediaPlaylist),
    /// Variant streams only. Described, never served.
    Master(MasterPlaylist),
}

pub async fn load_playlist<P>(path: P) -> LiveSimResult<PlaylistSource>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    log::info!("Loading playlist from {}", path.display());

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| LiveSimError::PlaylistReadError {
            path: path.to_path_buf(),
            source,
        })?;
    let playlist = decode_playlist(&bytes)?;

    match &playlist {
        PlaylistSource::Media(pl) => log::info!(
            "Media playlist loaded: {count} segments, target duration {target}, {kind}",
            count = pl.segments.len(),
            target = pl.target_duration,
            kind = if pl.end_list { "closed" } else { "live" }
        ),
        PlaylistSource::Master(pl) => log::info!(
            "Master playlist loaded: {count} variants",
            count = pl.variants.len()
        ),
    }

    Ok(playlist)
}

pub fn decode_playlist(bytes: &[u8]) -> LiveSimResult<PlaylistSource> {
    match m3u8_rs::parse_playlist_res(bytes) {
        Ok(Playlist::MediaPlaylist(pl)) => Ok(PlaylistSource::Media(pl)),
        Ok(Playlist::MasterPlaylist(pl)) => Ok(PlaylistSource::Master(pl)),
        Err(error) => Err(LiveSimError::M3u8ParseError(error.to_string())),
    }
}

pub fn render_media(playlist: &MediaPlaylist) -> LiveSimResult<Vec<u8>> {
    let mut output = Vec::new();
    playlist.write_to(&mut output)?;
    Ok(output)
}

/// Human readable summary of a master playlist, one line per variant.
pub fn describe_master(playlist: &MasterPlaylist) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Master playlist: {variants} variants, {alternatives} alternative renditions",
        variants = playlist.variants.len(),
        alternatives = playlist.alternatives.len()
    );

    for variant in &playlist.variants {
        let resolution = variant
            .resolution
            .as_ref()
            .map(|r| format!("{}x{}", r.width, r.height))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            output,
            "  bandwidth={bandwidth} resolution={resolution} codecs={codecs}{iframe} {uri}",
            bandwidth = variant.bandwidth,
            codecs = variant.codecs.as_deref().unwrap_or("-"),
            iframe = if variant.is_i_frame { " i-frame" } else { "" },
            uri = variant.uri,
        );
    }

    output
}
