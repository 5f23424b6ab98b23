//! Perceptual fingerprint (pHash) implementation.
//!
//! pHash runs a Discrete Cosine Transform over a downscaled grayscale copy
//! of the image and keeps one bit per low-frequency coefficient. Only exact
//! equality of the resulting bits is used to call two photos duplicates.
//!
//! Decoding and hashing are delegated to the `image` and `image_hasher`
//! crates.

use super::{Fingerprint, Fingerprinter};
use crate::error::FingerprintError;
use image::{DynamicImage, ImageError, ImageReader};
use image_hasher::{HashAlg, Hasher, HasherConfig};
use std::path::Path;

/// Default edge length of the hash grid (8x8 = 64 bits)
const DEFAULT_HASH_SIZE: u32 = 8;

/// Perceptual fingerprint using a DCT-preprocessed mean hash
pub struct PerceptualFingerprinter {
    hasher: Hasher,
}

impl PerceptualFingerprinter {
    /// Create a fingerprinter with the default 64-bit hash
    pub fn new() -> Self {
        Self::with_hash_size(DEFAULT_HASH_SIZE)
    }

    /// Create a fingerprinter with a custom hash grid size
    pub fn with_hash_size(hash_size: u32) -> Self {
        let hasher = HasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .to_hasher();

        Self { hasher }
    }

    /// Fingerprint an already-decoded image
    pub fn fingerprint_image(&self, image: &DynamicImage) -> Fingerprint {
        let hash = self.hasher.hash_image(image);
        Fingerprint::from_bytes(hash.as_bytes())
    }

    /// Decode by content, falling back to the extension when the magic bytes
    /// are not recognised
    fn decode(path: &Path) -> Result<DynamicImage, FingerprintError> {
        let io_error = |source: std::io::Error| FingerprintError::IoError {
            path: path.to_path_buf(),
            source,
        };

        ImageReader::open(path)
            .map_err(io_error)?
            .with_guessed_format()
            .map_err(io_error)?
            .decode()
            .map_err(|e| match e {
                ImageError::IoError(source) => io_error(source),
                other => FingerprintError::DecodeError {
                    path: path.to_path_buf(),
                    reason: other.to_string(),
                },
            })
    }
}

impl Default for PerceptualFingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter for PerceptualFingerprinter {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        let image = Self::decode(path)?;
        Ok(self.fingerprint_image(&image))
    }
}
