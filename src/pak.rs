//! The paired `.pak` (data) / `.idx` (directory) archive container.
use crate::cipher::{directory_cipher, graphics_cipher, script_body_cipher, PAK_OFFSET_ADJUST};
use crate::ext::io::{MemReader, MemWriter, ReadExt, WriteExt};
use crate::types::ExtraConfig;
use crate::utils::files;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Fixed, always-exact size of an `.idx` file.
pub const IDX_SIZE: usize = 0x61A84;
/// Width in bytes of one directory entry record.
pub const ENTRY_WIDTH: usize = 40;
/// Width in bytes of an entry's name field.
pub const NAME_WIDTH: usize = 24;
/// Maximum number of entries an `.idx` can hold.
pub const MAX_ENTRIES: usize = (IDX_SIZE - 4) / ENTRY_WIDTH;

/// One directory record: a name, its logical (stored) offset, and size.
#[derive(Debug, Clone)]
pub struct PakEntry {
    pub name: Vec<u8>,
    pub offset: u64,
    pub size: u32,
    pub flags: u32,
}

/// An open PAK/IDX pair. The `.pak` data file is not read until an entry is
/// extracted; the directory lives entirely in memory once opened.
#[derive(Debug)]
pub struct Pak {
    pak_path: PathBuf,
    idx_path: PathBuf,
    entries: Vec<PakEntry>,
    index: HashMap<Vec<u8>, usize>,
}

fn contains_subsequence(name: &[u8], needle: &str) -> bool {
    let needle = needle.as_bytes();
    if needle.len() > name.len() {
        return false;
    }
    name.windows(needle.len()).any(|w| w == needle)
}

/// Decrypts or encrypts `body` in place according to the dispatch rule
/// implied by `name`'s extension: a name containing `.dat` gets the
/// script-body cipher, one containing `.gr` gets the graphics cipher,
/// anything else is left alone. The cipher is self-inverse so the same
/// function serves both directions.
///
/// This mirrors the reference engine's dispatch exactly: a case-sensitive
/// substring search for `.dat`/`.gr` anywhere in the name, not an
/// anchored, case-insensitive suffix check.
pub fn dispatch_cipher(name: &[u8], body: &mut [u8]) {
    if contains_subsequence(name, ".dat") {
        script_body_cipher(body);
    } else if contains_subsequence(name, ".gr") {
        graphics_cipher(body);
    }
}

fn name_field(name: &[u8]) -> Result<[u8; NAME_WIDTH]> {
    anyhow::ensure!(
        name.len() < NAME_WIDTH,
        "entry name too long for a {NAME_WIDTH}-byte field: {:?}",
        String::from_utf8_lossy(name)
    );
    let mut field = [0u8; NAME_WIDTH];
    field[..name.len()].copy_from_slice(name);
    Ok(field)
}

impl Pak {
    /// Opens an existing PAK/IDX pair at `pak_path` (its `.idx` sibling is
    /// derived by swapping the extension). Loads and decrypts the
    /// directory; the data file is untouched until an entry is extracted.
    pub fn open<P: AsRef<Path>>(pak_path: P) -> Result<Self> {
        let pak_path = pak_path.as_ref().to_path_buf();
        let idx_path = pak_path.with_extension("idx");
        if !pak_path.exists() {
            return Err(anyhow!("InvalidContainer: missing data file {:?}", pak_path));
        }
        let mut idx_bytes = files::read_file(&idx_path)?;
        if idx_bytes.len() != IDX_SIZE {
            return Err(anyhow!(
                "InvalidContainer: {:?} is {} bytes, expected {IDX_SIZE}",
                idx_path,
                idx_bytes.len()
            ));
        }
        directory_cipher(&mut idx_bytes);

        let mut reader = MemReader::new(idx_bytes);
        let mut entries = Vec::new();
        let mut index = HashMap::new();
        loop {
            let pos = entries.len() * ENTRY_WIDTH;
            if pos + ENTRY_WIDTH > IDX_SIZE - 4 {
                break;
            }
            reader.seek(SeekFrom::Start(pos as u64))?;
            let name = reader.read_fixed_name(NAME_WIDTH)?;
            if name.is_empty() {
                break;
            }
            let offset = reader.read_u64()?;
            let size = reader.read_u32()?;
            let flags = reader.read_u32()?;
            index.insert(name.clone(), entries.len());
            entries.push(PakEntry {
                name,
                offset,
                size,
                flags,
            });
        }

        Ok(Pak {
            pak_path,
            idx_path,
            entries,
            index,
        })
    }

    /// Directory entries in on-disk (table) order.
    pub fn entries(&self) -> &[PakEntry] {
        &self.entries
    }

    /// Looks up an entry's metadata by exact name bytes.
    pub fn entry(&self, name: &[u8]) -> Option<&PakEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Extracts one entry's bytes, decrypting per the filename-extension
    /// dispatch rule.
    pub fn extract(&self, name: &[u8]) -> Result<Vec<u8>> {
        let entry = self
            .entry(name)
            .ok_or_else(|| anyhow!("NotFound: no such entry {:?}", String::from_utf8_lossy(name)))?;
        let mut file = std::fs::File::open(&self.pak_path)?;
        let actual_offset = entry
            .offset
            .checked_sub(PAK_OFFSET_ADJUST)
            .ok_or_else(|| anyhow!("InvalidContainer: offset underflow for {:?}", name))?;
        file.seek(SeekFrom::Start(actual_offset))?;
        let mut buf = vec![0u8; entry.size as usize];
        std::io::Read::read_exact(&mut file, &mut buf)?;
        dispatch_cipher(&entry.name, &mut buf);
        Ok(buf)
    }

    /// Creates a brand-new PAK/IDX pair from an ordered list of
    /// `(name, bytes)` pairs. Bodies are encrypted per [`dispatch_cipher`]
    /// unless `config.encrypt_by_default` is `false`.
    pub fn create<P: AsRef<Path>>(
        pak_path: P,
        names_and_bodies: &[(Vec<u8>, Vec<u8>)],
        config: &ExtraConfig,
    ) -> Result<()> {
        anyhow::ensure!(
            names_and_bodies.len() <= MAX_ENTRIES,
            "CapacityExceeded: {} entries exceeds the maximum of {MAX_ENTRIES}",
            names_and_bodies.len()
        );
        let pak_path = pak_path.as_ref().to_path_buf();
        let idx_path = pak_path.with_extension("idx");

        let mut names_seen = std::collections::HashSet::new();
        let mut entries = Vec::with_capacity(names_and_bodies.len());
        let mut pak_bytes = Vec::new();
        for (name, body) in names_and_bodies {
            anyhow::ensure!(
                names_seen.insert(name.clone()),
                "CapacityExceeded: duplicate entry name {:?}",
                String::from_utf8_lossy(name)
            );
            let mut body = body.clone();
            if config.encrypt_by_default {
                dispatch_cipher(name, &mut body);
            }
            let logical_offset = pak_bytes.len() as u64 + PAK_OFFSET_ADJUST;
            let size = body.len() as u32;
            pak_bytes.extend_from_slice(&body);
            entries.push(PakEntry {
                name: name.clone(),
                offset: logical_offset,
                size,
                flags: 0,
            });
        }

        let mut idx = MemWriter::zeroed(IDX_SIZE);
        for (i, entry) in entries.iter().enumerate() {
            idx.seek(SeekFrom::Start((i * ENTRY_WIDTH) as u64))?;
            idx.write_all(&name_field(&entry.name)?)?;
            idx.write_u64(entry.offset)?;
            idx.write_u32(entry.size)?;
            idx.write_u32(entry.flags)?;
        }
        idx.seek(SeekFrom::Start((IDX_SIZE - 4) as u64))?;
        idx.write_all(&[0x60, 0, 0, 0])?;

        let mut idx_bytes = idx.data;
        directory_cipher(&mut idx_bytes);

        files::write_file(&pak_path, &pak_bytes)?;
        files::write_file(&idx_path, &idx_bytes)?;
        Ok(())
    }

    /// Appends one file to an already-open archive and rewrites the `.idx`
    /// in place. The new body is written starting at the current `.pak`
    /// length.
    pub fn append(&mut self, name: Vec<u8>, body: &[u8], config: &ExtraConfig) -> Result<()> {
        anyhow::ensure!(
            !self.index.contains_key(&name),
            "CapacityExceeded: duplicate entry name {:?}",
            String::from_utf8_lossy(&name)
        );
        anyhow::ensure!(
            self.entries.len() < MAX_ENTRIES,
            "CapacityExceeded: directory already holds the maximum of {MAX_ENTRIES} entries"
        );
        let pak_len = if self.pak_path.exists() {
            files::read_file(&self.pak_path)?.len() as u64
        } else {
            0
        };
        let mut body = body.to_vec();
        if config.encrypt_by_default {
            dispatch_cipher(&name, &mut body);
        }
        let mut pak_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.pak_path)?;
        pak_file.write_all(&body)?;

        let entry = PakEntry {
            name: name.clone(),
            offset: pak_len + PAK_OFFSET_ADJUST,
            size: body.len() as u32,
            flags: 0,
        };
        self.index.insert(name, self.entries.len());
        self.entries.push(entry);
        self.rewrite_idx()
    }

    fn rewrite_idx(&self) -> Result<()> {
        let mut idx = MemWriter::zeroed(IDX_SIZE);
        for (i, entry) in self.entries.iter().enumerate() {
            idx.seek(SeekFrom::Start((i * ENTRY_WIDTH) as u64))?;
            idx.write_all(&name_field(&entry.name)?)?;
            idx.write_u64(entry.offset)?;
            idx.write_u32(entry.size)?;
            idx.write_u32(entry.flags)?;
        }
        idx.seek(SeekFrom::Start((IDX_SIZE - 4) as u64))?;
        idx.write_all(&[0x60, 0, 0, 0])?;
        let mut idx_bytes = idx.data;
        directory_cipher(&mut idx_bytes);
        files::write_file(&self.idx_path, &idx_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc() -> ExtraConfig {
        ExtraConfig {
            encrypt_by_default: true,
        }
    }

    fn noenc() -> ExtraConfig {
        ExtraConfig {
            encrypt_by_default: false,
        }
    }

    fn tmp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("eagls_pak_test_{tag}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn create_then_open_then_extract_round_trips() {
        let dir = tmp_dir("roundtrip");
        let pak_path = dir.join("game.pak");
        let files = vec![
            (b"HELLO.DAT".to_vec(), vec![b'x'; 4]),
            (b"scenario.dat".to_vec(), vec![b'y'; 4000]),
            (b"pic.gr".to_vec(), vec![1, 2, 3, 4, 5]),
            (b"DATA.BIN".to_vec(), vec![9, 9, 9]),
        ];
        Pak::create(&pak_path, &files, &enc()).unwrap();

        let idx_bytes = std::fs::read(dir.join("game.idx")).unwrap();
        assert_eq!(idx_bytes.len(), IDX_SIZE);

        let archive = Pak::open(&pak_path).unwrap();
        assert_eq!(archive.entries().len(), 4);
        for (name, body) in &files {
            let extracted = archive.extract(name).unwrap();
            assert_eq!(&extracted, body, "entry {:?}", String::from_utf8_lossy(name));
        }
    }

    #[test]
    fn idx_trailer_and_plaintext_record_known_answer() {
        // one entry "HELLO.DAT" size 4, decrypt disabled.
        let dir = tmp_dir("kav");
        let pak_path = dir.join("one.pak");
        let files = vec![(b"HELLO.DAT".to_vec(), vec![0xABu8; 4])];
        Pak::create(&pak_path, &files, &noenc()).unwrap();

        let mut idx_bytes = std::fs::read(dir.join("one.idx")).unwrap();
        assert_eq!(idx_bytes.len(), IDX_SIZE);
        assert_eq!(idx_bytes[IDX_SIZE - 4], 0x60);
        assert_eq!(&idx_bytes[IDX_SIZE - 3..IDX_SIZE], &[0, 0, 0]);

        directory_cipher(&mut idx_bytes);
        let mut reader = MemReader::new(idx_bytes);
        let name = reader.read_fixed_name(NAME_WIDTH).unwrap();
        assert_eq!(name, b"HELLO.DAT");
        let offset = reader.read_u64().unwrap();
        let size = reader.read_u32().unwrap();
        assert_eq!(offset, PAK_OFFSET_ADJUST);
        assert_eq!(size, 4);
    }

    #[test]
    fn append_grows_directory_and_pak_body() {
        let dir = tmp_dir("append");
        let pak_path = dir.join("grow.pak");
        Pak::create(&pak_path, &[(b"A.BIN".to_vec(), vec![1, 2, 3])], &enc()).unwrap();
        let mut archive = Pak::open(&pak_path).unwrap();
        archive.append(b"B.BIN".to_vec(), &[4, 5], &enc()).unwrap();

        let reopened = Pak::open(&pak_path).unwrap();
        assert_eq!(reopened.entries().len(), 2);
        assert_eq!(reopened.extract(b"A.BIN").unwrap(), vec![1, 2, 3]);
        assert_eq!(reopened.extract(b"B.BIN").unwrap(), vec![4, 5]);
    }

    #[test]
    fn open_rejects_wrong_size_index() {
        let dir = tmp_dir("badsize");
        std::fs::write(dir.join("bad.pak"), b"").unwrap();
        std::fs::write(dir.join("bad.idx"), vec![0u8; 100]).unwrap();
        assert!(Pak::open(dir.join("bad.pak")).is_err());
    }

    #[test]
    fn create_rejects_duplicate_names() {
        let dir = tmp_dir("dupe");
        let pak_path = dir.join("dupe.pak");
        let files = vec![
            (b"A.BIN".to_vec(), vec![1]),
            (b"A.BIN".to_vec(), vec![2]),
        ];
        assert!(Pak::create(&pak_path, &files, &enc()).is_err());
    }

    #[test]
    fn extension_dispatch_matches_lowercase_substring_case_sensitively() {
        assert!(contains_subsequence(b"foo.dat", ".dat"));
        assert!(contains_subsequence(b"a.dat.bak", ".dat"));
        assert!(!contains_subsequence(b"FOO.DAT", ".dat"));
        assert!(contains_subsequence(b"foo.gr", ".gr"));
        assert!(!contains_subsequence(b"foo.grx", "nonexistent"));
    }

    #[test]
    fn dispatch_cipher_is_a_noop_for_uppercase_and_unrecognized_extensions() {
        let mut a = vec![1u8, 2, 3, 4, 5];
        let mut b = a.clone();
        dispatch_cipher(b"HELLO.DAT", &mut a);
        assert_eq!(a, b, "uppercase extension should not trigger dispatch");
        dispatch_cipher(b"readme.txt", &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn dispatch_cipher_applies_for_lowercase_dat_and_gr() {
        let mut dat_body = vec![0u8; 4000];
        let original = dat_body.clone();
        dispatch_cipher(b"scenario.dat", &mut dat_body);
        assert_ne!(dat_body, original);

        let mut gr_body: Vec<u8> = (0..100u32).map(|i| i as u8).collect();
        let original = gr_body.clone();
        dispatch_cipher(b"pic.gr", &mut gr_body);
        assert_ne!(gr_body, original);
    }

}
