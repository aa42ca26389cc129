//! Durable storage for the corpus index.
//!
//! Two artifacts live under the index directory: `index.dense`, the dense
//! vectors in a binary row-major dump (magic, version, dimension, row count,
//! then `f32` little-endian data), and `corpus.json`, the ordered entry array
//! in human-inspectable JSON. The BM25 index is never persisted; it is rebuilt
//! from the entries on load. Both files are written to a temporary sibling and
//! renamed into place so a crash cannot leave a torn artifact behind.

use super::{CorpusEntry, CorpusIndex, DenseIndex, IndexError};
use std::fs;
use std::path::{Path, PathBuf};

const DENSE_FILE: &str = "index.dense";
const CORPUS_FILE: &str = "corpus.json";
const DENSE_MAGIC: [u8; 4] = *b"EXRG";
const DENSE_VERSION: u32 = 1;

/// Persist the dense index and the aligned corpus entries under `dir`.
pub fn save(index: &CorpusIndex, dir: &Path) -> Result<(), IndexError> {
    fs::create_dir_all(dir)?;

    let corpus_json = serde_json::to_vec_pretty(index.entries())?;
    write_atomic(&dir.join(CORPUS_FILE), &corpus_json)?;

    let dense_bytes = encode_dense(index.dense())?;
    write_atomic(&dir.join(DENSE_FILE), &dense_bytes)?;

    tracing::info!(
        dir = %dir.display(),
        entries = index.len(),
        "Persisted corpus and dense index"
    );
    Ok(())
}

/// Load a previously persisted corpus index from `dir`.
///
/// Returns `Ok(None)` when either artifact is absent, which triggers a full
/// rebuild upstream. Present-but-inconsistent artifacts are an error.
pub fn load(dir: &Path) -> Result<Option<CorpusIndex>, IndexError> {
    let corpus_path = dir.join(CORPUS_FILE);
    let dense_path = dir.join(DENSE_FILE);
    if !corpus_path.exists() || !dense_path.exists() {
        tracing::debug!(dir = %dir.display(), "No persisted index found");
        return Ok(None);
    }

    let entries: Vec<CorpusEntry> = serde_json::from_slice(&fs::read(&corpus_path)?)?;
    let dense = decode_dense(&fs::read(&dense_path)?)?;
    let index = CorpusIndex::from_parts(entries, dense)?;

    tracing::info!(
        dir = %dir.display(),
        entries = index.len(),
        dim = index.dense().dim(),
        "Loaded persisted index"
    );
    Ok(Some(index))
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), IndexError> {
    let tmp = temp_path(path);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn encode_dense(dense: &DenseIndex) -> Result<Vec<u8>, IndexError> {
    let rows = u32::try_from(dense.len())
        .map_err(|_| IndexError::Corrupt("dense index row count exceeds u32".to_string()))?;
    let dim = u32::try_from(dense.dim())
        .map_err(|_| IndexError::Corrupt("dense index dimension exceeds u32".to_string()))?;

    let mut bytes = Vec::with_capacity(16 + dense.raw_data().len() * 4);
    bytes.extend_from_slice(&DENSE_MAGIC);
    bytes.extend_from_slice(&DENSE_VERSION.to_le_bytes());
    bytes.extend_from_slice(&dim.to_le_bytes());
    bytes.extend_from_slice(&rows.to_le_bytes());
    for value in dense.raw_data() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Ok(bytes)
}

fn decode_dense(bytes: &[u8]) -> Result<DenseIndex, IndexError> {
    if bytes.len() < 16 {
        return Err(IndexError::Corrupt("dense file shorter than header".to_string()));
    }
    if bytes[0..4] != DENSE_MAGIC {
        return Err(IndexError::Corrupt("dense file magic mismatch".to_string()));
    }
    let version = read_u32(&bytes[4..8]);
    if version != DENSE_VERSION {
        return Err(IndexError::Corrupt(format!(
            "unsupported dense file version {version}"
        )));
    }
    let dim = read_u32(&bytes[8..12]) as usize;
    let rows = read_u32(&bytes[12..16]) as usize;

    let payload = &bytes[16..];
    let expected_bytes = rows
        .checked_mul(dim)
        .and_then(|floats| floats.checked_mul(4))
        .ok_or_else(|| IndexError::Corrupt("dense file size overflow".to_string()))?;
    if payload.len() != expected_bytes {
        return Err(IndexError::Corrupt(format!(
            "dense file payload is {} bytes, expected {expected_bytes}",
            payload.len()
        )));
    }

    let data = payload
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    DenseIndex::from_raw(dim, data)
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> CorpusIndex {
        let entries = vec![
            CorpusEntry::question("1. 유동비율 계산: 100 50", "정답 200%"),
            CorpusEntry::question("2. 마케팅 믹스의 4P는", ""),
            CorpusEntry::passage("스포츠 산업 개요"),
        ];
        let mut dense = DenseIndex::new(4);
        dense.push(vec![1.0, 0.0, 0.0, 0.0]).expect("push");
        dense.push(vec![0.0, 1.0, 0.0, 0.0]).expect("push");
        dense.push(vec![0.5, 0.5, 0.5, 0.5]).expect("push");
        CorpusIndex::from_parts(entries, dense).expect("aligned")
    }

    #[test]
    fn round_trip_preserves_entries_and_vectors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = sample_index();
        save(&index, dir.path()).expect("save");

        let loaded = load(dir.path()).expect("load").expect("present");
        assert_eq!(loaded.entries(), index.entries());
        assert_eq!(loaded.dense(), index.dense());
        assert_eq!(loaded.lexical().len(), index.len());
    }

    #[test]
    fn load_returns_none_when_either_artifact_is_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load(dir.path()).expect("empty dir").is_none());

        let index = sample_index();
        save(&index, dir.path()).expect("save");
        fs::remove_file(dir.path().join(DENSE_FILE)).expect("remove");
        assert!(load(dir.path()).expect("partial dir").is_none());
    }

    #[test]
    fn corrupt_dense_header_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        save(&sample_index(), dir.path()).expect("save");
        fs::write(dir.path().join(DENSE_FILE), b"not a dense file").expect("write");
        assert!(matches!(
            load(dir.path()).unwrap_err(),
            IndexError::Corrupt(_)
        ));
    }

    #[test]
    fn corpus_json_is_an_ordered_array_of_entry_objects() {
        let dir = tempfile::tempdir().expect("tempdir");
        save(&sample_index(), dir.path()).expect("save");
        let raw = fs::read_to_string(dir.path().join(CORPUS_FILE)).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        let array = value.as_array().expect("array");
        assert_eq!(array.len(), 3);
        assert_eq!(array[0]["answer"], "정답 200%");
        assert!(array[2].get("answer").is_none());
    }

    #[test]
    fn no_temp_files_remain_after_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        save(&sample_index(), dir.path()).expect("save");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
