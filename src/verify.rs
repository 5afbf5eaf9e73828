use sha2::{Digest, Sha512};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub const HASH_LEN: usize = 64;
pub type HashResult = [u8; HASH_LEN];

/// Reader which hashes everything read through it.
pub struct StreamHasher<R: Read> {
    hasher: Sha512,
    input: R,
}

impl<R: Read> StreamHasher<R> {
    pub fn new(input: R) -> Self {
        StreamHasher {
            hasher: Sha512::default(),
            input,
        }
    }

    pub fn get_result(self) -> HashResult {
        let mut result = [0; HASH_LEN];
        result.copy_from_slice(self.hasher.finalize().as_slice());
        result
    }
}

impl<R: Read> Read for StreamHasher<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.input.read(buf)?;
        self.hasher.update(&buf[..size]);
        Ok(size)
    }
}

pub fn hash_file(path: &Path) -> io::Result<HashResult> {
    let mut hasher = StreamHasher::new(File::open(path)?);
    io::copy(&mut hasher, &mut io::sink())?;
    Ok(hasher.get_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hash_matches_content() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        fs::write(&a, b"Subject: hi\n\nbody\n").unwrap();
        fs::write(&b, b"Subject: hi\n\nbody!\n").unwrap();

        let mut hasher = StreamHasher::new(File::open(&a).unwrap());
        let mut content = vec![];
        hasher.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"Subject: hi\n\nbody\n");
        assert_eq!(hasher.get_result(), hash_file(&a).unwrap());
        assert_ne!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }
}
