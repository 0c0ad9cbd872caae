use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::ops::{Index, IndexMut};
use std::path::Path;

use crate::error::{Error, Result};

/// LC3 can address 128KB of memory.
pub const MEMORY_MAX: usize = 0x10000;

/// Size of a serialized image in bytes.
pub const IMAGE_BYTES: usize = MEMORY_MAX * 2;

/// Full memory image, one word per address. Always exactly [`MEMORY_MAX`] words long, so any
/// `u16` is a valid index.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    words: Box<[u16]>,
}

impl Image {
    pub fn new() -> Self {
        Image {
            words: vec![0; MEMORY_MAX].into_boxed_slice(),
        }
    }

    pub fn from_words(words: &[u16]) -> Result<Self> {
        if words.len() != MEMORY_MAX {
            return Err(Error::MalformedImage {
                len: words.len() * 2,
                expected: IMAGE_BYTES,
            });
        }
        Ok(Image {
            words: words.into(),
        })
    }

    /// Decode big-endian words.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != IMAGE_BYTES {
            return Err(Error::MalformedImage {
                len: bytes.len(),
                expected: IMAGE_BYTES,
            });
        }
        let words: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|word| u16::from_be_bytes([word[0], word[1]]))
            .collect();
        Ok(Image {
            words: words.into_boxed_slice(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|word| word.to_be_bytes()).collect()
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
        Self::from_bytes(&bytes)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let context = || format!("failed to write {}", path.display());
        let file = File::create(path).map_err(|e| Error::io(context(), e))?;
        let mut out = BufWriter::new(file);
        out.write_all(&self.to_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| Error::io(context(), e))
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<u16> for Image {
    type Output = u16;

    fn index(&self, addr: u16) -> &u16 {
        &self.words[addr as usize]
    }
}

impl IndexMut<u16> for Image {
    fn index_mut(&mut self, addr: u16) -> &mut u16 {
        &mut self.words[addr as usize]
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only non-zero words, the rest is noise
        let used = self.words.iter().enumerate().filter(|(_, w)| **w != 0);
        f.debug_map()
            .entries(used.map(|(addr, w)| (format!("x{addr:04X}"), format!("x{w:04X}"))))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_layout() {
        let mut image = Image::new();
        image[0] = 0x1234;
        image[0xFFFF] = 0xABCD;
        let bytes = image.to_bytes();
        assert_eq!(bytes.len(), IMAGE_BYTES);
        assert_eq!(&bytes[..2], &[0x12, 0x34]);
        assert_eq!(&bytes[IMAGE_BYTES - 2..], &[0xAB, 0xCD]);
        assert_eq!(Image::from_bytes(&bytes).unwrap(), image);
    }

    #[test]
    fn rejects_wrong_sizes() {
        assert!(matches!(
            Image::from_bytes(&[0; 10]),
            Err(Error::MalformedImage { len: 10, .. })
        ));
        assert!(Image::from_bytes(&vec![0; IMAGE_BYTES + 2]).is_err());
        assert!(Image::from_bytes(&vec![0; IMAGE_BYTES - 1]).is_err());
        assert!(Image::from_words(&[0; 3]).is_err());
        assert!(Image::from_words(&vec![0; MEMORY_MAX]).is_ok());
    }

    #[test]
    fn file_round_trip() {
        let mut image = Image::new();
        image[0x3000] = 0xF025;
        let path = std::env::temp_dir().join(format!("lc3kit-image-{}.bin", std::process::id()));
        image.write(&path).unwrap();
        let read = Image::read(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(read, image);
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Image::read(Path::new("/definitely/not/here.bin")),
            Err(Error::Io { .. })
        ));
    }
}
