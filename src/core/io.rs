//! Resource access layer
//!
//! Chromosome sizes tables, FASTA indexes and FASTA files may live on local
//! disk or behind HTTP. Whole text resources are fetched once and transparently
//! decompressed; sequence files are read by byte range, over HTTP `Range`
//! requests or from a memory map / buffered seek on local disk.

use crate::core::error::{FetchError, FetchResult};
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Default buffer size for BufReader (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Threshold for using memory mapping (100MB)
pub const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Where a resource lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    /// `http://` or `https://` URL
    Remote(String),
    /// Local file
    Local(PathBuf),
}

impl Resource {
    /// Classify a location string
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Resource::Remote(trimmed.to_string())
        } else {
            Resource::Local(PathBuf::from(trimmed))
        }
    }

    /// Same location with `suffix` appended, e.g. `.fai`
    pub fn with_suffix(&self, suffix: &str) -> Self {
        match self {
            Resource::Remote(url) => Resource::Remote(format!("{}{}", url, suffix)),
            Resource::Local(path) => {
                let mut os = path.clone().into_os_string();
                os.push(suffix);
                Resource::Local(PathBuf::from(os))
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Resource::Remote(_))
    }

    fn io_error(&self, err: impl fmt::Display) -> FetchError {
        FetchError::Io {
            resource: self.to_string(),
            message: err.to_string(),
        }
    }

    fn http_error(&self, err: impl fmt::Display) -> FetchError {
        FetchError::Http {
            resource: self.to_string(),
            message: err.to_string(),
        }
    }
}

impl FromStr for Resource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Resource::parse(s))
    }
}

impl From<&Path> for Resource {
    fn from(path: &Path) -> Self {
        Resource::Local(path.to_path_buf())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Remote(url) => f.write_str(url),
            Resource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Compression of a fetched payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain text (uncompressed)
    Plain,
    /// Gzip or BGZF
    Gzip,
    /// Bzip2
    Bzip2,
}

/// Detect compression from magic bytes
pub fn detect_compression(bytes: &[u8]) -> CompressionFormat {
    match bytes {
        [0x1f, 0x8b, ..] => CompressionFormat::Gzip,
        // "BZh"
        [0x42, 0x5a, 0x68, ..] => CompressionFormat::Bzip2,
        _ => CompressionFormat::Plain,
    }
}

/// Decompress a payload if it carries a gzip or bzip2 header
pub fn decompress(bytes: Vec<u8>, resource: &Resource) -> FetchResult<Vec<u8>> {
    let decode_error = |err: std::io::Error| FetchError::Decode {
        resource: resource.to_string(),
        message: err.to_string(),
    };

    match detect_compression(&bytes) {
        CompressionFormat::Plain => Ok(bytes),
        CompressionFormat::Gzip => {
            let mut out = Vec::with_capacity(bytes.len() * 4);
            flate2::read::MultiGzDecoder::new(bytes.as_slice())
                .read_to_end(&mut out)
                .map_err(decode_error)?;
            Ok(out)
        }
        CompressionFormat::Bzip2 => {
            let mut out = Vec::with_capacity(bytes.len() * 4);
            bzip2::read::BzDecoder::new(bytes.as_slice())
                .read_to_end(&mut out)
                .map_err(decode_error)?;
            Ok(out)
        }
    }
}

/// Fetch a whole resource as raw bytes
pub async fn fetch_bytes(client: &reqwest::Client, resource: &Resource) -> FetchResult<Vec<u8>> {
    match resource {
        Resource::Remote(url) => {
            let response = client.get(url).send().await.map_err(|e| resource.http_error(e))?;
            check_status(resource, &response)?;
            let body = response.bytes().await.map_err(|e| resource.http_error(e))?;
            Ok(body.to_vec())
        }
        Resource::Local(path) => tokio::fs::read(path).await.map_err(|e| resource.io_error(e)),
    }
}

/// Fetch a whole text resource, decompressing gzip/bzip2 payloads
pub async fn fetch_text(client: &reqwest::Client, resource: &Resource) -> FetchResult<String> {
    let bytes = decompress(fetch_bytes(client, resource).await?, resource)?;
    String::from_utf8(bytes).map_err(|e| FetchError::Decode {
        resource: resource.to_string(),
        message: e.to_string(),
    })
}

/// Fetch a JSON document
pub async fn fetch_json<T: serde::de::DeserializeOwned>(client: &reqwest::Client, url: &str) -> FetchResult<T> {
    let resource = Resource::Remote(url.to_string());
    let bytes = fetch_bytes(client, &resource).await?;
    serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode {
        resource: resource.to_string(),
        message: e.to_string(),
    })
}

fn check_status(resource: &Resource, response: &reqwest::Response) -> FetchResult<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::Status {
            resource: resource.to_string(),
            status: status.as_u16(),
        })
    }
}

/// I/O strategy for local sequence files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoStrategy {
    /// Seek and read through a buffer of the given size
    Buffered(usize),
    /// Map the whole file
    MemoryMapped,
    /// Map files of at least [`MMAP_THRESHOLD`] bytes, buffer the rest
    #[default]
    Auto,
}

impl FromStr for IoStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(IoStrategy::Auto),
            "mmap" | "memory-mapped" => Ok(IoStrategy::MemoryMapped),
            "buffered" => Ok(IoStrategy::Buffered(DEFAULT_BUFFER_SIZE)),
            other => Err(format!("unknown I/O strategy '{}'", other)),
        }
    }
}

/// Random-access byte reader over a local or remote file
#[derive(Debug)]
pub enum RangeReader {
    /// HTTP range requests
    Http { client: reqwest::Client, url: String },
    /// Whole file mapped into memory
    Mapped { path: PathBuf, mmap: Arc<Mmap> },
    /// Seek plus buffered read per request
    Buffered { path: PathBuf, buffer_size: usize },
}

impl RangeReader {
    /// Open a reader, choosing the local strategy from `strategy`
    pub async fn open(client: &reqwest::Client, resource: &Resource, strategy: IoStrategy) -> FetchResult<Self> {
        let path = match resource {
            Resource::Remote(url) => {
                return Ok(RangeReader::Http {
                    client: client.clone(),
                    url: url.clone(),
                })
            }
            Resource::Local(path) => path.clone(),
        };

        let file_size = tokio::fs::metadata(&path)
            .await
            .map_err(|e| resource.io_error(e))?
            .len();

        let use_mmap = match strategy {
            IoStrategy::MemoryMapped => true,
            IoStrategy::Buffered(_) => false,
            IoStrategy::Auto => file_size >= MMAP_THRESHOLD,
        };

        if use_mmap {
            let file = File::open(&path).map_err(|e| resource.io_error(e))?;
            // SAFETY: We assume the file won't be modified while mapped
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| resource.io_error(e))?;
            log::debug!("memory-mapped {} ({} bytes)", path.display(), file_size);
            Ok(RangeReader::Mapped {
                path,
                mmap: Arc::new(mmap),
            })
        } else {
            let buffer_size = match strategy {
                IoStrategy::Buffered(size) => size.max(1),
                _ => DEFAULT_BUFFER_SIZE,
            };
            Ok(RangeReader::Buffered { path, buffer_size })
        }
    }

    /// True when backed by a memory map
    pub fn is_mapped(&self) -> bool {
        matches!(self, RangeReader::Mapped { .. })
    }

    /// Read bytes `[start, end)`; ranges past the end of the file come back short
    pub async fn read_range(&self, start: u64, end: u64) -> FetchResult<Vec<u8>> {
        if start >= end {
            return Ok(Vec::new());
        }

        match self {
            RangeReader::Http { client, url } => {
                let resource = Resource::Remote(url.clone());
                let response = client
                    .get(url)
                    .header(reqwest::header::RANGE, format!("bytes={}-{}", start, end - 1))
                    .send()
                    .await
                    .map_err(|e| resource.http_error(e))?;
                check_status(&resource, &response)?;

                let ranged = response.status() == reqwest::StatusCode::PARTIAL_CONTENT;
                let body = response.bytes().await.map_err(|e| resource.http_error(e))?;
                if ranged {
                    Ok(body.to_vec())
                } else {
                    // Server ignored the Range header and sent the whole file
                    let len = body.len() as u64;
                    Ok(body[start.min(len) as usize..end.min(len) as usize].to_vec())
                }
            }
            RangeReader::Mapped { mmap, .. } => {
                let len = mmap.len() as u64;
                Ok(mmap[start.min(len) as usize..end.min(len) as usize].to_vec())
            }
            RangeReader::Buffered { path, buffer_size } => {
                let path = path.clone();
                let buffer_size = *buffer_size;
                let resource = Resource::Local(path.clone());
                tokio::task::spawn_blocking(move || read_local_range(&path, buffer_size, start, end))
                    .await
                    .map_err(|e| resource.io_error(e))?
                    .map_err(|e| resource.io_error(e))
            }
        }
    }
}

fn read_local_range(path: &Path, buffer_size: usize, start: u64, end: u64) -> std::io::Result<Vec<u8>> {
    let mut reader = BufReader::with_capacity(buffer_size, File::open(path)?);
    reader.seek(SeekFrom::Start(start))?;
    let mut out = Vec::with_capacity((end - start) as usize);
    reader.take(end - start).read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_resource_parse() {
        assert_eq!(
            Resource::parse("https://example.org/hg38.fa"),
            Resource::Remote("https://example.org/hg38.fa".to_string())
        );
        assert_eq!(
            Resource::parse("data/hg38.fa"),
            Resource::Local(PathBuf::from("data/hg38.fa"))
        );
        assert_eq!(
            Resource::parse("data/hg38.fa").with_suffix(".fai"),
            Resource::Local(PathBuf::from("data/hg38.fa.fai"))
        );
        assert_eq!(
            Resource::parse("http://x/y.fa").with_suffix(".fai").to_string(),
            "http://x/y.fa.fai"
        );
    }

    #[test]
    fn test_io_strategy_default() {
        assert_eq!(IoStrategy::default(), IoStrategy::Auto);
        assert_eq!("mmap".parse::<IoStrategy>().unwrap(), IoStrategy::MemoryMapped);
        assert!("fast".parse::<IoStrategy>().is_err());
    }

    #[test]
    fn test_detect_compression() {
        assert_eq!(detect_compression(&[0x1f, 0x8b, 0x08]), CompressionFormat::Gzip);
        assert_eq!(detect_compression(b"BZh91AY"), CompressionFormat::Bzip2);
        assert_eq!(detect_compression(b"chr1\t100"), CompressionFormat::Plain);
        assert_eq!(detect_compression(b""), CompressionFormat::Plain);
    }

    #[test]
    fn test_decompress_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"chr1\t1000\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let resource = Resource::parse("sizes.gz");
        assert_eq!(decompress(compressed, &resource).unwrap(), b"chr1\t1000\n");
        assert_eq!(decompress(b"plain".to_vec(), &resource).unwrap(), b"plain");
    }

    #[tokio::test]
    async fn test_fetch_text_local() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"chr1\t1000\nchr2\t500\n").unwrap();
        temp.flush().unwrap();

        let client = reqwest::Client::new();
        let text = fetch_text(&client, &Resource::from(temp.path())).await.unwrap();
        assert_eq!(text, "chr1\t1000\nchr2\t500\n");

        let missing = fetch_text(&client, &Resource::parse("/no/such/file.sizes")).await;
        assert!(matches!(missing, Err(FetchError::Io { .. })));
    }

    #[tokio::test]
    async fn test_range_reader_strategies() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"0123456789").unwrap();
        temp.flush().unwrap();

        let client = reqwest::Client::new();
        let resource = Resource::from(temp.path());
        for strategy in [IoStrategy::Buffered(4), IoStrategy::MemoryMapped, IoStrategy::Auto] {
            let reader = RangeReader::open(&client, &resource, strategy).await.unwrap();
            assert_eq!(reader.is_mapped(), strategy == IoStrategy::MemoryMapped);
            assert_eq!(reader.read_range(2, 6).await.unwrap(), b"2345");
            assert_eq!(reader.read_range(8, 20).await.unwrap(), b"89");
            assert!(reader.read_range(5, 5).await.unwrap().is_empty());
            assert!(reader.read_range(30, 40).await.unwrap().is_empty());
        }
    }
}
