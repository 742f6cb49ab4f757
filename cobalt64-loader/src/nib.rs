// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

// Design:
//   Raw track reads from a nibbler are longer than one disk revolution, so
//   the rotational wraparound has to be discovered before the data can be
//   stored as a G64 style track: find the first position whose sync-aligned
//   data repeats, then copy one revolution starting at the largest
//   inter-sector gap or, failing that, at sector 0.

/// Length of one raw track read.
pub const RAW_TRACK_LENGTH: usize = 0x2000;

/// Shortest useful track cycle; matches below this offset are noise.
const MIN_TRACK_LENGTH: usize = 0x1780;

/// Bytes compared when testing a candidate wraparound.
const MATCH_LENGTH: usize = 7;

fn is_sync(data: &[u8], pos: usize) -> bool {
    // a sync mark ends with an $ff run followed by a non-$ff byte
    pos >= 2 && data[pos - 2] == 0xff && data[pos - 1] == 0xff && data[pos] != 0xff
}

/// Position of the next sync mark at or after `pos`.
fn find_sync(data: &[u8], mut pos: usize, stop: usize) -> Option<usize> {
    while pos < stop {
        if is_sync(data, pos) {
            return Some(pos);
        }
        pos += 1;
    }
    None
}

/// Finds the rotational cycle of a raw track read: a matching 7-byte
/// window at a distance of at least one revolution. Returns (start, stop)
/// of one revolution.
pub fn find_track_cycle(data: &[u8]) -> Option<(usize, usize)> {
    let stop = data.len().saturating_sub(MATCH_LENGTH);
    let mut start = 0;
    loop {
        let next_start = find_sync(data, start, stop)?;
        if next_start + MIN_TRACK_LENGTH >= stop {
            return None;
        }
        let mut sync_pos = next_start + MIN_TRACK_LENGTH;
        while let Some(candidate) = find_sync(data, sync_pos, stop) {
            // see whether all remaining syncs match as well
            let mut p1 = next_start;
            let mut p2 = candidate;
            let mut matches = true;
            loop {
                if data[p1..p1 + MATCH_LENGTH] != data[p2..p2 + MATCH_LENGTH] {
                    matches = false;
                    break;
                }
                match (find_sync(data, p1 + 1, stop), find_sync(data, p2 + 1, stop)) {
                    (Some(n1), Some(n2)) => {
                        p1 = n1;
                        p2 = n2;
                    }
                    _ => break,
                }
            }
            if matches {
                return Some((next_start, candidate));
            }
            sync_pos = candidate + 1;
        }
        start = next_start + 1;
    }
}

/// Looks for the start of sector 0: the header byte sequence
/// 52 ?? x5 x8 that GCR encoding produces for header id $08, sector 0.
fn find_sector0(work: &[u8], track_len: usize) -> Option<usize> {
    let mut pos = 2;
    while pos < track_len + 2 {
        if is_sync(work, pos) {
            if work[pos] == 0x52
                && (work[pos + 2] & 0x0f) == 0x05
                && (work[pos + 3] & 0xf0) == 0x80
            {
                return Some(pos);
            }
        }
        pos += 1;
    }
    None
}

/// Looks for the largest gap between two sectors and returns the position
/// of the sync mark that follows it.
fn find_sector_gap(work: &[u8], track_len: usize) -> Option<usize> {
    let mut best_gap = 0usize;
    let mut best_pos = None;
    let mut prev_sync_end: Option<usize> = None;
    let mut pos = 2;
    while pos < 2 * track_len {
        if is_sync(work, pos) {
            if let Some(end) = prev_sync_end {
                let gap = pos - end;
                if gap > best_gap {
                    best_gap = gap;
                    best_pos = Some(pos);
                }
            }
            // skip past this block
            prev_sync_end = Some(pos);
        }
        pos += 1;
    }
    best_pos
}

/// Extracts exactly one revolution from a raw track read, aligned to the
/// sector gap when one exists.
pub fn extract_track(source: &[u8]) -> Vec<u8> {
    let (cycle_start, cycle_stop) = match find_track_cycle(source) {
        Some(cycle) => cycle,
        None => return Vec::new(),
    };
    let track_len = cycle_stop - cycle_start;
    // double the data so aligned copies can run over the seam
    let mut work = Vec::with_capacity(2 * track_len);
    work.extend_from_slice(&source[cycle_start..cycle_stop]);
    work.extend_from_slice(&source[cycle_start..cycle_stop]);

    let start = find_sector_gap(&work, track_len)
        .or_else(|| find_sector0(&work, track_len))
        .unwrap_or(0);
    work[start..start + track_len].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_track(revolution: &[u8]) -> Vec<u8> {
        let mut raw = Vec::new();
        while raw.len() < RAW_TRACK_LENGTH {
            raw.extend_from_slice(revolution);
        }
        raw.truncate(RAW_TRACK_LENGTH);
        raw
    }

    #[test]
    fn cycle_found_in_repeating_read() {
        // a revolution longer than the minimum track length with a sync
        let mut revolution = vec![0x55u8; MIN_TRACK_LENGTH + 16];
        revolution[10] = 0xff;
        revolution[11] = 0xff;
        revolution[12] = 0x52;
        revolution[13] = 0xa5;
        let raw = synthetic_track(&revolution);
        let (start, stop) = find_track_cycle(&raw).expect("no cycle found");
        assert_eq!(revolution.len(), stop - start);
    }

    #[test]
    fn extract_returns_one_revolution() {
        let mut revolution = vec![0x55u8; MIN_TRACK_LENGTH + 16];
        revolution[100] = 0xff;
        revolution[101] = 0xff;
        revolution[102] = 0x52;
        revolution[103] = 0x5a;
        let raw = synthetic_track(&revolution);
        let track = extract_track(&raw);
        assert_eq!(revolution.len(), track.len());
    }

    #[test]
    fn no_cycle_in_noise() {
        let raw = vec![0x55u8; RAW_TRACK_LENGTH];
        assert_eq!(None, find_track_cycle(&raw));
    }
}
