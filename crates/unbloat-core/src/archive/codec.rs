//! Compression detection for source archives.
//!
//! The outer compression is sniffed from the stream's magic bytes, so the
//! same source may arrive as `.tar`, `.tar.gz`, `.tar.bz2`, `.tar.xz` or
//! `.tar.zst` regardless of its file name.

use crate::error::{Result, RewriteError};
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use serde::Serialize;
use std::io::{BufReader, Chain, Cursor, Read};
use xz2::read::XzDecoder;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_SIGNATURE: &[u8] = b"BZh";
/// First bytes after the stream header: a compressed block (pi) or the
/// end-of-stream marker (sqrt pi) of an empty stream.
const BZIP2_BLOCK_MAGIC: &[u8] = &[0x31, 0x41, 0x59, 0x26, 0x53, 0x59];
const BZIP2_EOS_MAGIC: &[u8] = &[0x17, 0x72, 0x45, 0x38, 0x50, 0x90];
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Enough leading bytes to tell every supported codec apart.
const SNIFF_BYTES: u64 = 10;
const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Outer compression of a source archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Plain,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Codec {
    /// Identify the codec from the leading bytes of a stream. Anything not
    /// carrying a full compression signature is treated as a plain tar.
    pub fn detect(magic: &[u8]) -> Self {
        if magic.starts_with(GZIP_MAGIC) {
            Self::Gzip
        } else if is_bzip2(magic) {
            Self::Bzip2
        } else if magic.starts_with(XZ_MAGIC) {
            Self::Xz
        } else if magic.starts_with(ZSTD_MAGIC) {
            Self::Zstd
        } else {
            Self::Plain
        }
    }
}

/// `BZh`, a block size digit `1`-`9`, then a block or end-of-stream magic.
fn is_bzip2(magic: &[u8]) -> bool {
    match magic.strip_prefix(BZIP2_SIGNATURE) {
        Some([level, rest @ ..]) if (b'1'..=b'9').contains(level) => {
            rest.starts_with(BZIP2_BLOCK_MAGIC) || rest.starts_with(BZIP2_EOS_MAGIC)
        }
        _ => false,
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Plain => "tar",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        };
        f.write_str(name)
    }
}

/// The source with its sniffed prefix put back in front.
type Rejoined<R> = BufReader<Chain<Cursor<Vec<u8>>, R>>;

/// Decompressed view over a source stream.
pub(crate) enum Decoded<R: Read> {
    Plain(Rejoined<R>),
    Gzip(MultiGzDecoder<Rejoined<R>>),
    Bzip2(MultiBzDecoder<Rejoined<R>>),
    Xz(XzDecoder<Rejoined<R>>),
    #[cfg(feature = "zstd")]
    Zstd(zstd::stream::read::Decoder<'static, Rejoined<R>>),
}

impl<R: Read> Decoded<R> {
    /// Sniff the codec and wrap the matching decoder. The prefix is read
    /// until `SNIFF_BYTES` arrive or the source ends, so sources that
    /// deliver a few bytes per read are detected correctly.
    pub(crate) fn open(mut reader: R) -> Result<(Self, Codec)> {
        let mut magic = Vec::with_capacity(SNIFF_BYTES as usize);
        (&mut reader)
            .take(SNIFF_BYTES)
            .read_to_end(&mut magic)
            .map_err(|e| RewriteError::from(e).with_context("read source header"))?;
        if magic.is_empty() {
            return Err(RewriteError::format("source archive is empty"));
        }

        let codec = Codec::detect(&magic);
        let buffered = BufReader::with_capacity(READ_BUFFER_BYTES, Cursor::new(magic).chain(reader));
        let decoded = match codec {
            Codec::Plain => Self::Plain(buffered),
            Codec::Gzip => Self::Gzip(MultiGzDecoder::new(buffered)),
            Codec::Bzip2 => Self::Bzip2(MultiBzDecoder::new(buffered)),
            Codec::Xz => Self::Xz(XzDecoder::new_multi_decoder(buffered)),
            #[cfg(feature = "zstd")]
            Codec::Zstd => Self::Zstd(
                zstd::stream::read::Decoder::with_buffer(buffered)
                    .map_err(RewriteError::from_source_stream)?,
            ),
            #[cfg(not(feature = "zstd"))]
            Codec::Zstd => {
                return Err(RewriteError::format(
                    "zstd-compressed archives require the `zstd` feature",
                ))
            }
        };
        Ok((decoded, codec))
    }
}

impl<R: Read> Read for Decoded<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(r) => r.read(buf),
            Self::Gzip(r) => r.read(buf),
            Self::Bzip2(r) => r.read(buf),
            Self::Xz(r) => r.read(buf),
            #[cfg(feature = "zstd")]
            Self::Zstd(r) => r.read(buf),
        }
    }
}
