use std::{
    fs,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use bincode::{config, Decode, Encode};

#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("Failed to encode asset: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("Failed to decode asset: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Extension used for meshes written through [`Asset::save`]
pub const ASSET_EXTENSION: &str = "vgm.bin";

pub trait Asset: Sized + Encode + Decode {
    fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let mut file = BufWriter::new(fs::File::create(path)?);

        bincode::encode_into_std_write(self, &mut file, config::standard())?;
        file.flush()?;

        Ok(())
    }

    fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let mut file = BufReader::new(fs::File::open(path)?);

        Ok(bincode::decode_from_std_read(&mut file, config::standard())?)
    }
}
