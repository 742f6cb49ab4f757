// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::fs;
use std::io;
use std::io::{Cursor, Error, ErrorKind, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use cobalt64_core::drive::{Disk, MAX_HALFTRACK, MAX_TRACK_LENGTH};
use cobalt64_system::C64;

use super::{Image, Loader};

// Spec: http://ist.uwaterloo.ca/~schepers/formats/G64.TXT

static HEADER_SIG: &[u8; 8] = b"GCR-1541";

/// A G64 image carries the raw bit stream of each halftrack together with
/// a speed zone table.
pub struct G64Image {
    tracks: Vec<Option<(Vec<u8>, u32)>>,
    #[allow(dead_code)]
    speed_zones: Vec<u32>,
}

impl G64Image {
    pub fn from_bytes(data: &[u8]) -> io::Result<G64Image> {
        let mut rdr = Cursor::new(data);
        let mut signature = [0u8; 8];
        rdr.read_exact(&mut signature)?;
        if &signature != HEADER_SIG {
            return Err(Error::new(ErrorKind::InvalidData, "invalid G64 signature"));
        }
        let version = rdr.read_u8()?;
        if version != 0 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("unsupported G64 version {}", version),
            ));
        }
        let num_halftracks = rdr.read_u8()? as usize;
        let max_track_length = rdr.read_u16::<LittleEndian>()? as usize;
        if max_track_length > MAX_TRACK_LENGTH {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("track size {} out of range", max_track_length),
            ));
        }
        let mut offsets = Vec::with_capacity(num_halftracks);
        for _ in 0..num_halftracks {
            offsets.push(rdr.read_u32::<LittleEndian>()? as usize);
        }
        let mut speed_zones = Vec::with_capacity(num_halftracks);
        for _ in 0..num_halftracks {
            speed_zones.push(rdr.read_u32::<LittleEndian>()?);
        }
        let mut tracks = Vec::with_capacity(num_halftracks);
        for offset in offsets.iter() {
            if *offset == 0 {
                tracks.push(None);
                continue;
            }
            if *offset + 2 > data.len() {
                return Err(Error::new(ErrorKind::InvalidData, "track offset out of range"));
            }
            let length =
                data[*offset] as usize | ((data[*offset + 1] as usize) << 8);
            if length > max_track_length || *offset + 2 + length > data.len() {
                return Err(Error::new(ErrorKind::InvalidData, "track data out of range"));
            }
            let track_data = data[*offset + 2..*offset + 2 + length].to_vec();
            tracks.push(Some((track_data, (length * 8) as u32)));
        }
        Ok(G64Image {
            tracks,
            speed_zones,
        })
    }

    pub fn num_halftracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn to_disk(&self) -> Disk {
        let mut disk = Disk::new();
        for (i, track) in self.tracks.iter().enumerate() {
            let ht = i + 1;
            if ht > MAX_HALFTRACK {
                break;
            }
            if let Some((data, len_bits)) = track {
                disk.set_halftrack_data(ht, data, *len_bits);
            }
        }
        disk
    }

    /// Serializes a disk back into the G64 layout: offset table, speed
    /// table, then each track prefixed by its 16-bit length and padded to
    /// the maximum track size.
    pub fn serialize(disk: &Disk) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(HEADER_SIG);
        out.push(0); // version
        out.push(MAX_HALFTRACK as u8);
        out.write_u16::<LittleEndian>(MAX_TRACK_LENGTH as u16)
            .unwrap();
        let table_start = out.len();
        let data_start = table_start + MAX_HALFTRACK * 8;
        // offset table
        for i in 0..MAX_HALFTRACK {
            let offset = data_start + i * (MAX_TRACK_LENGTH + 2);
            out.write_u32::<LittleEndian>(offset as u32).unwrap();
        }
        // speed zone table, derived from the track number
        for i in 0..MAX_HALFTRACK {
            let track = (i / 2 + 1) as u8;
            let zone: u32 = match track {
                1..=17 => 3,
                18..=24 => 2,
                25..=30 => 1,
                _ => 0,
            };
            out.write_u32::<LittleEndian>(zone).unwrap();
        }
        for ht in 1..=MAX_HALFTRACK {
            let len_bytes = (disk.len_of_halftrack(ht) as usize + 7) / 8;
            out.write_u16::<LittleEndian>(len_bytes as u16).unwrap();
            out.extend_from_slice(&disk.halftrack_data(ht)[0..len_bytes]);
            for _ in len_bytes..MAX_TRACK_LENGTH {
                out.push(0x00);
            }
        }
        out
    }
}

pub struct G64Loader;

impl G64Loader {
    pub fn new() -> Self {
        Self {}
    }
}

struct G64MountableImage {
    image: Option<G64Image>,
}

impl Image for G64MountableImage {
    fn mount(&mut self, c64: &mut C64) {
        info!(target: "loader", "Mounting G64 image");
        if let Some(image) = self.image.take() {
            c64.insert_disk_8(image.to_disk());
        }
    }

    fn unmount(&mut self, c64: &mut C64) {
        c64.eject_disk_8();
    }
}

impl Loader for G64Loader {
    fn load(&self, path: &Path) -> Result<Box<dyn Image>, io::Error> {
        info!(target: "loader", "Loading G64 {}", path.to_string_lossy());
        let data = fs::read(path)?;
        let image = G64Image::from_bytes(&data)?;
        Ok(Box::new(G64MountableImage { image: Some(image) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_and_parse_round_trip() {
        let mut disk = Disk::new();
        disk.set_halftrack_data(1, &[0xff, 0xff, 0x52, 0x55], 32);
        disk.set_halftrack_data(5, &[0xaa; 100], 800);
        let bytes = G64Image::serialize(&disk);
        let image = G64Image::from_bytes(&bytes).expect("parse failed");
        assert_eq!(MAX_HALFTRACK, image.num_halftracks());
        let restored = image.to_disk();
        assert_eq!(32, restored.len_of_halftrack(1));
        assert_eq!(800, restored.len_of_halftrack(5));
        assert_eq!(
            &disk.halftrack_data(1)[0..4],
            &restored.halftrack_data(1)[0..4]
        );
    }

    #[test]
    fn rejects_bad_signature() {
        let data = b"NOT-1541xxxxxxxxxxxxxxxx".to_vec();
        assert!(G64Image::from_bytes(&data).is_err());
    }
}
