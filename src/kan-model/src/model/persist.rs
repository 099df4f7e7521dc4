//! On-disk model format: a bincode header followed by the bincode-encoded
//! `Sequential`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::Sequential;
use crate::{Error, Result};

const MAGIC: [u8; 4] = *b"KANM";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    format_version: u32,
}

pub fn save(model: &Sequential, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    let header = Header {
        magic: MAGIC,
        format_version: FORMAT_VERSION,
    };
    bincode::serialize_into(&mut writer, &header)?;
    bincode::serialize_into(&mut writer, model)?;
    writer.flush()?;

    debug!("Saved model '{}' to {}", model.name(), path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<Sequential> {
    let mut reader = BufReader::new(File::open(path)?);

    let header: Header = bincode::deserialize_from(&mut reader)
        .map_err(|e| Error::ModelLoad(format!("{}: unreadable header: {}", path.display(), e)))?;

    if header.magic != MAGIC {
        return Err(Error::ModelLoad(format!(
            "{}: not a Kan model file",
            path.display()
        )));
    }

    if header.format_version != FORMAT_VERSION {
        return Err(Error::ModelLoad(format!(
            "{}: unsupported format version {} (expected {})",
            path.display(),
            header.format_version,
            FORMAT_VERSION
        )));
    }

    let model: Sequential = bincode::deserialize_from(&mut reader)?;
    model
        .validate()
        .map_err(|e| Error::ModelLoad(format!("{}: {}", path.display(), e)))?;
    debug!("Read model '{}' from {}", model.name(), path.display());

    Ok(model)
}
