// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::io;
use std::io::{Error, ErrorKind};
use std::path::Path;

use super::crt::CrtLoader;
use super::d64::D64Loader;
use super::g64::G64Loader;
use super::{Image, Loader};

pub struct Loaders;

impl Loaders {
    pub fn from_ext(ext: Option<&str>) -> Result<Box<dyn Loader>, io::Error> {
        match ext {
            Some("crt") => Ok(Box::new(CrtLoader::new())),
            Some("d64") => Ok(Box::new(D64Loader::new())),
            Some("g64") => Ok(Box::new(G64Loader::new())),
            Some(ext) => Err(Error::new(
                ErrorKind::InvalidInput,
                format!("unknown image format {}", ext),
            )),
            None => Err(Error::new(ErrorKind::InvalidInput, "unknown image format")),
        }
    }

    pub fn from_path(path: &Path) -> Result<Box<dyn Loader>, io::Error> {
        let ext = path.extension().map(|s| s.to_str().unwrap_or(""));
        Loaders::from_ext(ext)
    }

    pub fn load(path: &Path) -> Result<Box<dyn Image>, io::Error> {
        let loader = Loaders::from_path(path)?;
        loader.load(path)
    }
}
