//! Keyframe analyzer
//!
//! Pure function over a `moof` box's bytes: classifies whether the fragment
//! begins on a sync sample per the ISO/IEC 14496-12 sample-flags rules in
//! `tfhd`/`trun`. Never touches codec payloads — only container metadata.

pub mod stats;

use crate::parser::children::walk_children;

/// Result of classifying a `moof`. Tri-valued rather than a boolean with an
/// out-of-band "unknown", per the keyframe-debug design note: a fragment
/// with no readable sample flags anywhere is genuinely unknown, not false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyframeClassification {
    Keyframe,
    NonKeyframe,
    Indeterminate,
}

/// Classify a `moof` box's leading sample as keyframe, non-keyframe, or
/// indeterminate. `moof_bytes` is the full box (header included).
pub fn detect_moof_keyframe(moof_bytes: &[u8]) -> KeyframeClassification {
    let mut has_explicit_keyframe = false;
    let mut has_explicit_non_keyframe = false;

    walk_children(moof_bytes, |child| {
        if &child.box_type != b"traf" {
            return;
        }
        let traf_bytes = &moof_bytes[child.offset..child.offset + child.size];
        classify_traf(traf_bytes, &mut has_explicit_keyframe, &mut has_explicit_non_keyframe);
    });

    if has_explicit_non_keyframe {
        KeyframeClassification::NonKeyframe
    } else if has_explicit_keyframe {
        KeyframeClassification::Keyframe
    } else {
        KeyframeClassification::Indeterminate
    }
}

fn classify_traf(traf_bytes: &[u8], has_keyframe: &mut bool, has_non_keyframe: &mut bool) {
    let mut default_sample_flags: Option<u32> = None;

    walk_children(traf_bytes, |child| {
        let child_bytes = &traf_bytes[child.offset..child.offset + child.size];
        match &child.box_type {
            b"tfhd" => {
                default_sample_flags = parse_tfhd_default_sample_flags(child_bytes);
            }
            b"trun" => {
                if let Some(flags) = resolve_trun_flags(child_bytes, default_sample_flags) {
                    match evaluate_flags(flags) {
                        KeyframeClassification::Keyframe => *has_keyframe = true,
                        KeyframeClassification::NonKeyframe => *has_non_keyframe = true,
                        KeyframeClassification::Indeterminate => {}
                    }
                }
            }
            _ => {}
        }
    });
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|s| u32::from_be_bytes(s.try_into().unwrap()))
}

/// 24-bit FullBox flags, stored in bytes 1..4 of the version+flags word.
fn full_box_flags(bytes: &[u8]) -> Option<u32> {
    read_u32(bytes, 8).map(|vf| vf & 0x00FF_FFFF)
}

/// `tfhd` after the 12-byte FullBox header + 4-byte track_ID (§4.3.1).
fn parse_tfhd_default_sample_flags(tfhd: &[u8]) -> Option<u32> {
    let flags = full_box_flags(tfhd)?;
    let mut offset = 16usize;

    if flags & 0x000001 != 0 {
        offset += 8; // base_data_offset
    }
    if flags & 0x000002 != 0 {
        offset += 4; // sample_description_index
    }
    if flags & 0x000008 != 0 {
        offset += 4; // default_sample_duration
    }
    if flags & 0x000010 != 0 {
        offset += 4; // default_sample_size
    }
    if flags & 0x000020 == 0 {
        return None;
    }
    read_u32(tfhd, offset)
}

/// `trun` after the 12-byte FullBox header + 4-byte sample_count (§4.3.1).
fn resolve_trun_flags(trun: &[u8], default_sample_flags: Option<u32>) -> Option<u32> {
    let flags = full_box_flags(trun)?;
    let sample_count = read_u32(trun, 12)?;
    if sample_count == 0 {
        return None;
    }

    let mut offset = 16usize;
    if flags & 0x001 != 0 {
        offset += 4; // data_offset
    }

    if flags & 0x004 != 0 {
        return read_u32(trun, offset); // first_sample_flags, priority 1
    }

    if flags & 0x400 != 0 {
        let mut entry_offset = offset;
        if flags & 0x100 != 0 {
            entry_offset += 4; // sample_duration of first entry
        }
        if flags & 0x200 != 0 {
            entry_offset += 4; // sample_size of first entry
        }
        return read_u32(trun, entry_offset); // priority 2
    }

    default_sample_flags // priority 3
}

/// §4.3.2: interpret a 32-bit sample-flags word.
fn evaluate_flags(flags: u32) -> KeyframeClassification {
    let sample_depends_on = (flags >> 24) & 0x3;
    let sample_is_non_sync = (flags >> 16) & 0x1;

    if sample_depends_on == 1 {
        KeyframeClassification::NonKeyframe
    } else if sample_depends_on == 2 {
        KeyframeClassification::Keyframe
    } else if sample_is_non_sync == 1 {
        KeyframeClassification::NonKeyframe
    } else {
        KeyframeClassification::Keyframe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fullbox(box_type: &[u8; 4], flags24: u32, rest: &[u8]) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.push(0); // version
        payload.extend_from_slice(&flags24.to_be_bytes()[1..]); // 24-bit flags
        payload.extend_from_slice(rest);
        let size = (8 + payload.len()) as u32;
        let mut out = Vec::with_capacity(size as usize);
        out.extend_from_slice(&size.to_be_bytes());
        out.extend_from_slice(box_type);
        out.extend_from_slice(&payload);
        out
    }

    fn container(box_type: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
        let mut payload = Vec::new();
        for c in children {
            payload.extend_from_slice(c);
        }
        let size = (8 + payload.len()) as u32;
        let mut out = Vec::with_capacity(size as usize);
        out.extend_from_slice(&size.to_be_bytes());
        out.extend_from_slice(box_type);
        out.extend_from_slice(&payload);
        out
    }

    #[test]
    fn test_evaluate_flags_depends_on_priority() {
        let depends_none_but_non_sync = (0u32 << 24) | (1 << 16);
        assert_eq!(evaluate_flags(depends_none_but_non_sync), KeyframeClassification::NonKeyframe);

        let depends_on_none = 0u32;
        assert_eq!(evaluate_flags(depends_on_none), KeyframeClassification::Keyframe);

        let depends_on_others = 1u32 << 24;
        assert_eq!(evaluate_flags(depends_on_others), KeyframeClassification::NonKeyframe);

        let depends_on_none_explicit = 2u32 << 24;
        assert_eq!(evaluate_flags(depends_on_none_explicit), KeyframeClassification::Keyframe);
    }

    #[test]
    fn test_trun_first_sample_flags_wins_over_default() {
        // tr_flags: 0x004 (first_sample_flags)
        let mut trun_rest = Vec::new();
        trun_rest.extend_from_slice(&1u32.to_be_bytes()); // sample_count
        trun_rest.extend_from_slice(&(2u32 << 24).to_be_bytes()); // first_sample_flags: keyframe
        let trun = fullbox(b"trun", 0x004, &trun_rest);

        let mut tfhd_rest = Vec::new();
        tfhd_rest.extend_from_slice(&0u32.to_be_bytes()); // track_ID
        tfhd_rest.extend_from_slice(&(1u32 << 24).to_be_bytes()); // default: non-keyframe
        let tfhd = fullbox(b"tfhd", 0x000020, &tfhd_rest);

        let traf = container(b"traf", &[tfhd, trun]);
        let moof = container(b"moof", &[traf]);

        assert_eq!(detect_moof_keyframe(&moof), KeyframeClassification::Keyframe);
    }

    #[test]
    fn test_trun_falls_back_to_default_sample_flags() {
        let mut trun_rest = Vec::new();
        trun_rest.extend_from_slice(&1u32.to_be_bytes()); // sample_count
        let trun = fullbox(b"trun", 0x000, &trun_rest);

        let mut tfhd_rest = Vec::new();
        tfhd_rest.extend_from_slice(&0u32.to_be_bytes()); // track_ID
        tfhd_rest.extend_from_slice(&(1u32 << 24).to_be_bytes()); // default: non-keyframe
        let tfhd = fullbox(b"tfhd", 0x000020, &tfhd_rest);

        let traf = container(b"traf", &[tfhd, trun]);
        let moof = container(b"moof", &[traf]);

        assert_eq!(detect_moof_keyframe(&moof), KeyframeClassification::NonKeyframe);
    }

    #[test]
    fn test_no_readable_flags_is_indeterminate() {
        let mut trun_rest = Vec::new();
        trun_rest.extend_from_slice(&1u32.to_be_bytes());
        let trun = fullbox(b"trun", 0x000, &trun_rest);

        let mut tfhd_rest = Vec::new();
        tfhd_rest.extend_from_slice(&0u32.to_be_bytes());
        let tfhd = fullbox(b"tfhd", 0x000000, &tfhd_rest); // no default_sample_flags bit

        let traf = container(b"traf", &[tfhd, trun]);
        let moof = container(b"moof", &[traf]);

        assert_eq!(detect_moof_keyframe(&moof), KeyframeClassification::Indeterminate);
    }

    #[test]
    fn test_zero_sample_count_is_indeterminate() {
        let mut trun_rest = Vec::new();
        trun_rest.extend_from_slice(&0u32.to_be_bytes()); // sample_count 0
        trun_rest.extend_from_slice(&(2u32 << 24).to_be_bytes());
        let trun = fullbox(b"trun", 0x004, &trun_rest);

        let mut tfhd_rest = Vec::new();
        tfhd_rest.extend_from_slice(&0u32.to_be_bytes());
        let tfhd = fullbox(b"tfhd", 0x000000, &tfhd_rest);

        let traf = container(b"traf", &[tfhd, trun]);
        let moof = container(b"moof", &[traf]);

        assert_eq!(detect_moof_keyframe(&moof), KeyframeClassification::Indeterminate);
    }

    #[test]
    fn test_non_keyframe_dominates_across_trafs() {
        let mut kf_trun_rest = Vec::new();
        kf_trun_rest.extend_from_slice(&1u32.to_be_bytes());
        kf_trun_rest.extend_from_slice(&(2u32 << 24).to_be_bytes());
        let kf_trun = fullbox(b"trun", 0x004, &kf_trun_rest);
        let kf_tfhd_rest = 0u32.to_be_bytes().to_vec();
        let kf_tfhd = fullbox(b"tfhd", 0x000000, &kf_tfhd_rest);
        let kf_traf = container(b"traf", &[kf_tfhd, kf_trun]);

        let mut nk_trun_rest = Vec::new();
        nk_trun_rest.extend_from_slice(&1u32.to_be_bytes());
        nk_trun_rest.extend_from_slice(&(1u32 << 24).to_be_bytes());
        let nk_trun = fullbox(b"trun", 0x004, &nk_trun_rest);
        let nk_tfhd_rest = 0u32.to_be_bytes().to_vec();
        let nk_tfhd = fullbox(b"tfhd", 0x000000, &nk_tfhd_rest);
        let nk_traf = container(b"traf", &[nk_tfhd, nk_trun]);

        let moof = container(b"moof", &[kf_traf, nk_traf]);
        assert_eq!(detect_moof_keyframe(&moof), KeyframeClassification::NonKeyframe);
    }
}
