//! # Archive Inspection
//!
//! Read-only access to archives produced by the packer: entry listing,
//! single-entry reads and the optional `(listfile)` record.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::PackError;
use crate::pack::LISTING_ENTRY;

/// One entry of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    /// Uncompressed size.
    pub size: u64,
    pub compressed_size: u64,
}

fn open(path: &Path) -> Result<ZipArchive<BufReader<File>>, PackError> {
    let read_failed = |source: io::Error| PackError::InputReadFailed {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_failed)?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| read_failed(e.into()))
}

/// Lists every file entry of the archive at `path`, in archive order.
pub fn list_entries(path: &Path) -> Result<Vec<EntryInfo>, PackError> {
    let mut archive = open(path)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| PackError::InputReadFailed {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if entry.is_dir() {
            continue;
        }
        entries.push(EntryInfo {
            name: entry.name().to_string(),
            size: entry.size(),
            compressed_size: entry.compressed_size(),
        });
    }
    Ok(entries)
}

/// Reads and decompresses one entry. `Ok(None)` when no entry has that name.
pub fn read_entry(path: &Path, name: &str) -> Result<Option<Vec<u8>>, PackError> {
    let mut archive = open(path)?;
    let read_failed = |source: io::Error| PackError::InputReadFailed {
        path: path.to_path_buf(),
        source,
    };
    let mut entry = match archive.by_name(name) {
        Ok(e) => e,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(read_failed(e.into())),
    };
    let mut data = Vec::new();
    entry.read_to_end(&mut data).map_err(read_failed)?;
    Ok(Some(data))
}

/// Names stored in the `(listfile)` record, if the archive carries one.
pub fn read_listing(path: &Path) -> Result<Option<Vec<String>>, PackError> {
    let Some(data) = read_entry(path, LISTING_ENTRY)? else {
        return Ok(None);
    };
    let text = String::from_utf8_lossy(&data);
    Ok(Some(
        text.split(['\r', '\n'])
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::file_list::FileList;
    use crate::pack::{pack, PackOptions};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn lists_and_reads_packed_entries() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.bin");
        fs::write(&src, vec![7u8; 4096]).unwrap();
        let list: FileList = [("blob.bin", src)].into_iter().collect();
        let archive = dir.path().join("out.zip");
        pack(&list, &archive, PackOptions { include_listing: true, ..PackOptions::default() }).unwrap();

        let entries = list_entries(&archive).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["blob.bin", LISTING_ENTRY]);
        assert_eq!(entries[0].size, 4096);
        assert!(entries[0].compressed_size < 4096);

        assert_eq!(read_entry(&archive, "blob.bin").unwrap().unwrap(), vec![7u8; 4096]);
        assert_eq!(read_entry(&archive, "nope").unwrap(), None);
        assert_eq!(read_listing(&archive).unwrap().unwrap(), ["blob.bin"]);
    }

    #[test]
    fn archive_without_listing() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a");
        fs::write(&src, b"a").unwrap();
        let list: FileList = [("a", src)].into_iter().collect();
        let archive = dir.path().join("out.zip");
        pack(&list, &archive, PackOptions::default()).unwrap();
        assert_eq!(read_listing(&archive).unwrap(), None);
    }

    fn patch_u32(bytes: &mut [u8], signature: &[u8; 4], offset: usize, value: u32) {
        let at = bytes
            .windows(4)
            .position(|w| w == signature)
            .expect("header present");
        bytes[at + offset..at + offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn inflated_header_size_is_not_trusted() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("small");
        fs::write(&src, b"hello").unwrap();
        let list: FileList = [("small", src)].into_iter().collect();
        let archive = dir.path().join("out.zip");
        let options = PackOptions {
            compression: crate::archive::Compression::Store,
            ..PackOptions::default()
        };
        pack(&list, &archive, options).unwrap();

        // Claim ~4 GiB of uncompressed data in both headers.
        let mut bytes = fs::read(&archive).unwrap();
        patch_u32(&mut bytes, b"PK\x03\x04", 22, 0xFFFF_FFF0);
        patch_u32(&mut bytes, b"PK\x01\x02", 24, 0xFFFF_FFF0);
        fs::write(&archive, &bytes).unwrap();

        match read_entry(&archive, "small") {
            Ok(data) => assert_eq!(data.unwrap(), b"hello"),
            Err(e) => assert_eq!(e.kind(), ErrorKind::InputReadFailed),
        }
    }

    #[test]
    fn non_archive_is_input_read_failed() {
        let dir = tempdir().unwrap();
        let bogus = dir.path().join("bogus.zip");
        fs::write(&bogus, b"definitely not a zip").unwrap();
        assert_eq!(list_entries(&bogus).unwrap_err().kind(), ErrorKind::InputReadFailed);
        assert_eq!(
            list_entries(&dir.path().join("missing.zip")).unwrap_err().kind(),
            ErrorKind::InputReadFailed
        );
    }
}
