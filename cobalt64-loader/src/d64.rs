// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::fs;
use std::io;
use std::io::{Error, ErrorKind};
use std::path::Path;

use cobalt64_core::drive::Disk;
use cobalt64_core::factory::DiskArchive;
use cobalt64_system::C64;

use super::{Image, Loader};

// Spec: http://ist.uwaterloo.ca/~schepers/formats/D64.TXT

const BLOCK_SIZE: usize = 256;
const DIRECTORY_TRACK: u8 = 18;

/// The three supported capacities, in sectors.
const CAPACITIES: [(usize, u8); 3] = [(683, 35), (768, 40), (802, 42)];

pub fn num_sectors(track: u8) -> u8 {
    match track {
        1..=17 => 21,
        18..=24 => 19,
        25..=30 => 18,
        _ => 17,
    }
}

fn sector_offset(track: u8, sector: u8) -> usize {
    let mut blocks = 0usize;
    for t in 1..track {
        blocks += num_sectors(t) as usize;
    }
    (blocks + sector as usize) * BLOCK_SIZE
}

/// One directory entry of the CBM filesystem on track 18.
pub struct DirEntry {
    pub file_type: u8,
    pub first_track: u8,
    pub first_sector: u8,
    pub name: String,
    pub blocks: u16,
}

pub struct D64Image {
    data: Vec<u8>,
    tracks: u8,
    error_bytes: bool,
}

impl D64Image {
    pub fn from_bytes(data: &[u8]) -> io::Result<D64Image> {
        for (sectors, tracks) in CAPACITIES.iter() {
            if data.len() == sectors * BLOCK_SIZE {
                return Ok(D64Image {
                    data: data.to_vec(),
                    tracks: *tracks,
                    error_bytes: false,
                });
            }
            // one error byte per sector may trail the sector data
            if data.len() == sectors * BLOCK_SIZE + sectors {
                return Ok(D64Image {
                    data: data.to_vec(),
                    tracks: *tracks,
                    error_bytes: true,
                });
            }
        }
        Err(Error::new(
            ErrorKind::InvalidData,
            format!("invalid image capacity {}", data.len()),
        ))
    }

    pub fn has_error_bytes(&self) -> bool {
        self.error_bytes
    }

    /// Walks the directory sectors of track 18; each holds eight entries of
    /// 32 bytes.
    pub fn directory(&self) -> Vec<DirEntry> {
        let mut entries = Vec::new();
        let mut track = DIRECTORY_TRACK;
        let mut sector = 1;
        let mut visited = 0;
        while track != 0 && visited < 19 {
            let block = self.sector(track, sector);
            for i in 0..8 {
                let entry = &block[i * 32..(i + 1) * 32];
                let file_type = entry[2];
                if file_type == 0 {
                    continue;
                }
                let mut name = String::new();
                for byte in entry[5..21].iter() {
                    if *byte == 0xa0 {
                        break;
                    }
                    name.push(*byte as char);
                }
                entries.push(DirEntry {
                    file_type,
                    first_track: entry[3],
                    first_sector: entry[4],
                    name,
                    blocks: entry[30] as u16 | ((entry[31] as u16) << 8),
                });
            }
            let next_track = block[0];
            let next_sector = block[1];
            track = next_track;
            sector = next_sector;
            visited += 1;
        }
        entries
    }

    /// Extracts file content by following the sector chain.
    pub fn read_file(&self, entry: &DirEntry) -> io::Result<Vec<u8>> {
        let mut result = Vec::new();
        let mut track = entry.first_track;
        let mut sector = entry.first_sector;
        let mut visited = 0;
        while track != 0 {
            if track as usize > self.tracks as usize || sector >= num_sectors(track) {
                return Err(Error::new(ErrorKind::InvalidData, "sector not found"));
            }
            if visited > 802 {
                return Err(Error::new(ErrorKind::InvalidData, "cyclic sector chain"));
            }
            let block = self.sector(track, sector);
            if block[0] == 0 {
                // last sector; byte 1 holds the number of used bytes
                let used = block[1] as usize;
                result.extend_from_slice(&block[2..=used.max(2).min(255)]);
                break;
            }
            result.extend_from_slice(&block[2..]);
            track = block[0];
            sector = block[1];
            visited += 1;
        }
        Ok(result)
    }
}

impl DiskArchive for D64Image {
    fn num_tracks(&self) -> u8 {
        self.tracks
    }

    fn num_sectors(&self, track: u8) -> u8 {
        num_sectors(track)
    }

    fn sector(&self, track: u8, sector: u8) -> &[u8] {
        let offset = sector_offset(track, sector);
        &self.data[offset..offset + BLOCK_SIZE]
    }

    fn disk_id(&self) -> (u8, u8) {
        // disk id bytes live in the BAM at offsets $a2/$a3
        let bam = self.sector(DIRECTORY_TRACK, 0);
        (bam[0xa2], bam[0xa3])
    }
}

pub struct D64Loader;

impl D64Loader {
    pub fn new() -> Self {
        Self {}
    }
}

struct D64MountableImage {
    image: Option<D64Image>,
}

impl Image for D64MountableImage {
    fn mount(&mut self, c64: &mut C64) {
        info!(target: "loader", "Mounting D64 image");
        if let Some(image) = self.image.take() {
            let mut disk = Disk::new();
            disk.encode_archive(&image);
            c64.insert_disk_8(disk);
        }
    }

    fn unmount(&mut self, c64: &mut C64) {
        c64.eject_disk_8();
    }
}

impl Loader for D64Loader {
    fn load(&self, path: &Path) -> Result<Box<dyn Image>, io::Error> {
        info!(target: "loader", "Loading D64 {}", path.to_string_lossy());
        let data = fs::read(path)?;
        let image = D64Image::from_bytes(&data)?;
        Ok(Box::new(D64MountableImage { image: Some(image) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn make_blank_image(tracks: u8) -> Vec<u8> {
        let mut sectors = 0usize;
        for track in 1..=tracks {
            sectors += num_sectors(track) as usize;
        }
        let mut data = vec![0u8; sectors * BLOCK_SIZE];
        // BAM with disk id
        let bam = sector_offset(18, 0);
        data[bam + 0xa2] = 0x41;
        data[bam + 0xa3] = 0x42;
        data
    }

    #[test]
    fn capacity_detection() {
        let image = D64Image::from_bytes(&make_blank_image(35)).unwrap();
        assert_eq!(35, image.num_tracks());
        let image = D64Image::from_bytes(&make_blank_image(40)).unwrap();
        assert_eq!(40, image.num_tracks());
        assert!(D64Image::from_bytes(&vec![0u8; 1000]).is_err());
    }

    #[test]
    fn error_byte_extension() {
        let mut data = make_blank_image(35);
        let len = data.len();
        data.resize(len + 683, 0);
        let image = D64Image::from_bytes(&data).unwrap();
        assert_eq!(true, image.has_error_bytes());
    }

    #[test]
    fn disk_id_from_bam() {
        let image = D64Image::from_bytes(&make_blank_image(35)).unwrap();
        assert_eq!((0x41, 0x42), image.disk_id());
    }

    #[test]
    fn directory_walks_track_18() {
        let mut data = make_blank_image(35);
        // one entry in the first directory sector
        let dir = sector_offset(18, 1);
        data[dir + 2] = 0x82; // PRG
        data[dir + 3] = 17; // first track
        data[dir + 4] = 0; // first sector
        for (i, byte) in b"HELLO".iter().enumerate() {
            data[dir + 5 + i] = *byte;
        }
        for i in 5..16 {
            data[dir + 5 + i] = 0xa0;
        }
        data[dir + 30] = 0x03;
        let image = D64Image::from_bytes(&data).unwrap();
        let entries = image.directory();
        assert_eq!(1, entries.len());
        assert_eq!("HELLO", entries[0].name);
        assert_eq!(0x82, entries[0].file_type);
        assert_eq!(3, entries[0].blocks);
    }

    #[test]
    fn gcr_round_trip_over_encode_decode() {
        let mut data = make_blank_image(35);
        // recognizable payload in track 1 sector 0 and track 35 sector 16
        for i in 0..256 {
            data[i] = i as u8;
        }
        let last = sector_offset(35, 16);
        for i in 0..256 {
            data[last + i] = (255 - i) as u8;
        }
        let image = D64Image::from_bytes(&data).unwrap();
        let mut disk = Disk::new();
        disk.encode_archive(&image);
        let decoded = disk.decode().expect("decode failed");
        assert_eq!(data.len(), decoded.len());
        assert_eq!(&data[..], &decoded[..]);
    }
}
