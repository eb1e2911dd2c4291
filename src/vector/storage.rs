//! Index artifact persistence.
//!
//! The whole index is written to one file. Saves go to a temporary file in
//! the destination directory which is then renamed over the target, so a
//! reader never sees a half-written artifact. Loads memory-map the file and
//! verify the trailing checksum before decoding anything.
//!
//! # Storage Format
//!
//! All integers are little-endian.
//! - Header: magic `DCIX`, version (u32), dimension (u32), metric id (u8),
//!   entry count (u64), model id (u32 length + UTF-8), created-at (i64 unix seconds)
//! - Entries: position (u32), page (u32, 0 = none), start (u64), end (u64),
//!   source id (u32 length + UTF-8), text (u32 length + UTF-8), vector (dimension × f32)
//! - Partition flag (u8); when 1: centroid count (u32), centroids (count × dimension × f32),
//!   one u32 assignment per entry
//! - SHA-256 of every preceding byte (32 bytes)

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use memmap2::MmapOptions;
use sha2::{Digest, Sha256};

use crate::error::{ErrorContext, RagError, RagResult};
use crate::types::Chunk;
use crate::vector::index::{IndexEntry, Partition, VectorIndex};
use crate::vector::types::{ClusterId, DistanceMetric, VectorDimension};

/// Magic bytes identifying index artifacts.
const MAGIC_BYTES: &[u8; 4] = b"DCIX";

/// Current artifact format version.
const STORAGE_VERSION: u32 = 1;

const CHECKSUM_SIZE: usize = 32;

/// Magic + version + dimension + metric + count + model length + timestamp.
const MIN_HEADER_SIZE: usize = 4 + 4 + 4 + 1 + 8 + 4 + 8;

/// Serializes `index` and atomically replaces the artifact at `path`.
pub fn write_index(index: &VectorIndex, path: &Path) -> RagResult<()> {
    let bytes = encode(index)?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).with_path(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).with_path(parent)?;
    tmp.write_all(&bytes).with_path(tmp.path())?;
    tmp.as_file().sync_all().with_path(tmp.path())?;
    tmp.persist(path).map_err(|e| RagError::io(path, e.error))?;

    tracing::debug!(
        "wrote {} entries ({} bytes) to {}",
        index.len(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Reads and validates the artifact at `path`.
pub fn read_index(path: &Path) -> RagResult<VectorIndex> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RagError::IndexNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(RagError::io(path, e)),
    };

    let len = file.metadata().with_path(path)?.len() as usize;
    if len < MIN_HEADER_SIZE + 1 + CHECKSUM_SIZE {
        return Err(RagError::corrupt(path, "file too small to contain an index"));
    }

    // SAFETY: the artifact is only ever replaced by rename, never modified in place
    let mmap = unsafe { MmapOptions::new().map(&file) }.with_path(path)?;

    let (body, checksum) = mmap.split_at(mmap.len() - CHECKSUM_SIZE);
    if Sha256::digest(body).as_slice() != checksum {
        return Err(RagError::corrupt(path, "checksum mismatch"));
    }

    decode(body).map_err(|reason| RagError::corrupt(path, reason))
}

fn encode(index: &VectorIndex) -> RagResult<Vec<u8>> {
    let dimension = index.dimension().get();
    let mut out = ByteWriter::default();

    out.bytes(MAGIC_BYTES);
    out.u32(STORAGE_VERSION);
    out.u32(to_u32(dimension, "dimension")?);
    out.u8(index.metric().id());
    out.u64(index.len() as u64);
    out.string(index.model())?;
    out.i64(index.created_at().timestamp());

    for entry in index.entries() {
        let chunk = &entry.chunk;
        out.u32(chunk.position);
        out.u32(chunk.page.unwrap_or(0));
        out.u64(chunk.start as u64);
        out.u64(chunk.end as u64);
        out.string(&chunk.source_id)?;
        out.string(&chunk.text)?;
        out.floats(&entry.vector);
    }

    match index.partition() {
        Some(partition) => {
            out.u8(1);
            out.u32(to_u32(partition.len(), "partition count")?);
            for centroid in &partition.centroids {
                out.floats(centroid);
            }
            for cluster in &partition.assignments {
                out.u32(cluster.get());
            }
        }
        None => out.u8(0),
    }

    let mut bytes = out.into_inner();
    let checksum = Sha256::digest(&bytes);
    bytes.extend_from_slice(&checksum);
    Ok(bytes)
}

fn decode(body: &[u8]) -> Result<VectorIndex, String> {
    let mut input = ByteReader::new(body);

    if input.take(4)? != MAGIC_BYTES {
        return Err("invalid magic bytes".to_string());
    }
    let version = input.u32()?;
    if version != STORAGE_VERSION {
        return Err(format!(
            "unsupported format version {version} (expected {STORAGE_VERSION})"
        ));
    }

    let dimension = VectorDimension::new(input.u32()? as usize).map_err(|e| e.to_string())?;
    let metric_id = input.u8()?;
    let metric =
        DistanceMetric::from_id(metric_id).ok_or_else(|| format!("unknown metric id {metric_id}"))?;
    let count = input.u64()? as usize;
    let model = input.string()?;
    let created_at = DateTime::<Utc>::from_timestamp(input.i64()?, 0)
        .ok_or_else(|| "invalid creation timestamp".to_string())?;

    // Each entry needs at least its fixed fields plus the vector
    let min_entry = 4 + 4 + 8 + 8 + 4 + 4 + dimension.get() * 4;
    if count.saturating_mul(min_entry) > input.remaining() {
        return Err(format!("entry count {count} exceeds file size"));
    }

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let position = input.u32()?;
        let page = match input.u32()? {
            0 => None,
            n => Some(n),
        };
        let start = input.u64()? as usize;
        let end = input.u64()? as usize;
        let source_id = input.string()?;
        let text = input.string()?;
        let vector = input.floats(dimension.get())?;
        entries.push(IndexEntry {
            chunk: Chunk {
                text,
                source_id,
                position,
                start,
                end,
                page,
            },
            vector,
        });
    }

    let partition = match input.u8()? {
        0 => None,
        1 => {
            let k = input.u32()? as usize;
            if k == 0 || k.saturating_mul(dimension.get() * 4) > input.remaining() {
                return Err(format!("invalid partition count {k}"));
            }
            let centroids = (0..k)
                .map(|_| input.floats(dimension.get()))
                .collect::<Result<Vec<_>, _>>()?;
            let mut assignments = Vec::with_capacity(count);
            for _ in 0..count {
                let cluster = input.u32()?;
                if cluster as usize >= k {
                    return Err(format!("partition assignment {cluster} out of range"));
                }
                assignments.push(ClusterId::new(cluster));
            }
            Some(Partition::new(centroids, assignments))
        }
        flag => return Err(format!("invalid partition flag {flag}")),
    };

    if input.remaining() != 0 {
        return Err(format!("{} trailing bytes after index data", input.remaining()));
    }

    Ok(VectorIndex::from_parts(
        dimension, metric, model, created_at, entries, partition,
    ))
}

fn to_u32(value: usize, what: &str) -> RagResult<u32> {
    u32::try_from(value).map_err(|_| RagError::config(format!("{what} {value} exceeds u32")))
}

#[derive(Default)]
struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn string(&mut self, s: &str) -> RagResult<()> {
        self.u32(to_u32(s.len(), "string length")?);
        self.bytes(s.as_bytes());
        Ok(())
    }

    fn floats(&mut self, values: &[f32]) {
        for &value in values {
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        if n > self.remaining() {
            return Err(format!("unexpected end of data at byte {}", self.offset));
        }
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], String> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, String> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, String> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, String> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, String> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn string(&mut self) -> Result<String, String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| "invalid UTF-8 in string field".to_string())
    }

    fn floats(&mut self, n: usize) -> Result<Vec<f32>, String> {
        let bytes = self.take(n * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}
