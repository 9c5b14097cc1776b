#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Cursor, Read, Write};

/// One entry of a test archive.
pub enum Entry<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
    /// Regular file whose name goes into the header untouched.
    Raw(&'a str, &'a [u8]),
    HardLink(&'a str, &'a str),
    Symlink(&'a str, &'a str),
}

pub fn tar_bytes(entries: &[Entry<'_>]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        match entry {
            Entry::File(name, data) => {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(data.len() as u64);
                header.set_mode(0o600);
                header.set_mtime(1_700_000_000);
                builder.append_data(&mut header, name, *data).unwrap();
            }
            Entry::Dir(name) => {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                builder.append_data(&mut header, name, std::io::empty()).unwrap();
            }
            Entry::Raw(name, data) => {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(data.len() as u64);
                header.set_mode(0o600);
                header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
                header.set_cksum();
                builder.append(&header, *data).unwrap();
            }
            Entry::HardLink(name, target) | Entry::Symlink(name, target) => {
                let entry_type = match entry {
                    Entry::HardLink(..) => tar::EntryType::Link,
                    _ => tar::EntryType::Symlink,
                };
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(entry_type);
                header.set_size(0);
                header.set_mode(0o777);
                header.set_link_name(target).unwrap();
                builder.append_data(&mut header, name, std::io::empty()).unwrap();
            }
        }
    }
    builder.into_inner().unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn xz(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn tar_gz(entries: &[Entry<'_>]) -> Vec<u8> {
    gzip(&tar_bytes(entries))
}

/// Read every regular file of a tar.gz as (name, content), in order.
pub fn read_tar_gz(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    assert_eq!(&bytes[..2], &[0x1f, 0x8b], "output must be gzip");
    let decoder = flate2::read::GzDecoder::new(Cursor::new(bytes));
    let mut archive = tar::Archive::new(decoder);
    let mut out = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        out.push((name, content));
    }
    out
}

pub fn numbered_log(lines: usize) -> Vec<u8> {
    (0..lines)
        .map(|i| format!("2024-03-09T07:05:{:02} INFO request {} served\n", i % 60, i))
        .collect::<String>()
        .into_bytes()
}

pub fn names(members: &[(String, Vec<u8>)]) -> Vec<&str> {
    members.iter().map(|(n, _)| n.as_str()).collect()
}
