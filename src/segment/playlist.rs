//! Playlist text generation (§4.4)
//!
//! Builds the rolling HLS v7 playlist the way the teacher builds its VOD
//! variant playlists: plain `push_str`/`format!` into a `String`, not a
//! playlist-object crate.

use std::collections::{BTreeMap, BTreeSet};

/// Render the current sliding-window playlist for one stream.
///
/// `segment_index` is the next index to be emitted (i.e. one past the last
/// segment actually written); the window covers
/// `[max(0, segment_index - max_segments), segment_index)`.
pub fn generate_playlist(
    segment_index: u64,
    max_segments: usize,
    segment_duration_secs: f64,
    segment_durations: &BTreeMap<u64, f64>,
    discontinuity_indices: &BTreeSet<u64>,
) -> String {
    let start_index = segment_index.saturating_sub(max_segments as u64);

    let mut target_duration = segment_duration_secs;
    for i in start_index..segment_index {
        let d = segment_durations.get(&i).copied().unwrap_or(segment_duration_secs);
        if d > target_duration {
            target_duration = d;
        }
    }

    let mut out = String::new();
    out.push_str("#EXTM3U\n");
    out.push_str("#EXT-X-VERSION:7\n");
    out.push_str(&format!("#EXT-X-TARGETDURATION:{}\n", target_duration.ceil() as u64));
    out.push_str(&format!("#EXT-X-MEDIA-SEQUENCE:{}\n", start_index));
    out.push_str("#EXT-X-MAP:URI=\"init.mp4\"\n");

    for i in start_index..segment_index {
        if discontinuity_indices.contains(&i) {
            out.push_str("#EXT-X-DISCONTINUITY\n");
            out.push_str("#EXT-X-MAP:URI=\"init.mp4\"\n");
        }
        let duration = segment_durations.get(&i).copied().unwrap_or(segment_duration_secs);
        out.push_str(&format!("#EXTINF:{:.3},\n", duration));
        out.push_str(&format!("segment{}.m4s\n", i));
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_has_header_only() {
        let playlist = generate_playlist(0, 6, 2.0, &BTreeMap::new(), &BTreeSet::new());
        assert!(playlist.starts_with("#EXTM3U\n#EXT-X-VERSION:7\n"));
        assert!(playlist.contains("#EXT-X-TARGETDURATION:2\n"));
        assert!(playlist.contains("#EXT-X-MEDIA-SEQUENCE:0\n"));
        assert!(playlist.contains("#EXT-X-MAP:URI=\"init.mp4\"\n"));
        assert!(!playlist.contains("#EXTINF"));
    }

    #[test]
    fn test_media_sequence_tracks_window_start() {
        let mut durations = BTreeMap::new();
        for i in 2..5 {
            durations.insert(i, 4.0);
        }
        let playlist = generate_playlist(5, 3, 4.0, &durations, &BTreeSet::new());
        assert!(playlist.contains("#EXT-X-MEDIA-SEQUENCE:2\n"));
        assert!(playlist.contains("segment2.m4s"));
        assert!(playlist.contains("segment3.m4s"));
        assert!(playlist.contains("segment4.m4s"));
        assert!(!playlist.contains("segment1.m4s"));
    }

    #[test]
    fn test_target_duration_never_under_declares_segment_duration() {
        let mut durations = BTreeMap::new();
        durations.insert(0, 1.2);
        let playlist = generate_playlist(1, 6, 6.0, &durations, &BTreeSet::new());
        assert!(playlist.contains("#EXT-X-TARGETDURATION:6\n"));
    }

    #[test]
    fn test_target_duration_reflects_longest_observed_segment() {
        let mut durations = BTreeMap::new();
        durations.insert(0, 6.2);
        durations.insert(1, 5.9);
        let playlist = generate_playlist(2, 6, 6.0, &durations, &BTreeSet::new());
        assert!(playlist.contains("#EXT-X-TARGETDURATION:7\n"));
    }

    #[test]
    fn test_discontinuity_reannounces_init_map() {
        let mut durations = BTreeMap::new();
        durations.insert(0, 2.0);
        durations.insert(1, 2.0);
        let mut discontinuities = BTreeSet::new();
        discontinuities.insert(1);

        let playlist = generate_playlist(2, 6, 2.0, &durations, &discontinuities);
        let disc_pos = playlist.find("#EXT-X-DISCONTINUITY").unwrap();
        let reannounce_pos = playlist[disc_pos..].find("#EXT-X-MAP:URI=\"init.mp4\"").unwrap() + disc_pos;
        let extinf_pos = playlist[reannounce_pos..].find("#EXTINF").unwrap() + reannounce_pos;
        assert!(disc_pos < reannounce_pos);
        assert!(reannounce_pos < extinf_pos);
        assert!(playlist.contains("segment1.m4s"));
    }

    #[test]
    fn test_ends_with_blank_line() {
        let playlist = generate_playlist(0, 6, 2.0, &BTreeMap::new(), &BTreeSet::new());
        assert!(playlist.ends_with('\n'));
    }
}
