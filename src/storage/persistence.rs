//! Single-file binary snapshot of the whole index.
//!
//! All multi-byte values are little-endian and all lengths are fixed at
//! 64 bits regardless of host width, so snapshots move between platforms.
//! Fields are written contiguously with no padding:
//!
//! ```text
//! sq_enabled        u8 (0/1)
//! sq_dim            u64                 ─┐ only when sq_enabled;
//! mins              f32 × sq_dim         │ sq_dim is 0 for a
//! maxs              f32 × sq_dim        ─┘ present-but-untrained quantizer
//! m, ef_construction, ef_search  i32 each
//! metric            i32 (L2=0, Cosine=1, IP=2)
//! num_nodes         u64
//!   per node:       id u32, max_layer i32,
//!                   then per layer 0..=max_layer:
//!                     num_neighbors u64, neighbor ids i32 × num_neighbors
//! num_vectors       u64 (must equal num_nodes)
//! vector_dim        u64
//!   per vector:     f32 × vector_dim, meta_size u64,
//!                   then per pair: key_size u64, key bytes,
//!                                  value_size u64, value bytes (UTF-8)
//! num_deleted       u64
//! deleted ids       u32 × num_deleted (sorted)
//! ```
//!
//! Neighbor ids are written as signed 32-bit on disk even though node
//! ids are unsigned in memory. The entry point is not persisted; a
//! loaded index seeds it from the last node.

use crate::error::{Error, Result};
use crate::hnsw::{DistanceMetric, Hnsw, HnswConfig, Node};
use crate::quantization::ScalarQuantizer;
use crate::record::{Metadata, SyncMode};
use crate::storage::VectorStorage;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Write the index to `path` in the snapshot layout.
pub fn save_index(path: &Path, index: &Hnsw, sync_mode: SyncMode) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(&[index.quantizer().is_some() as u8])?;
    if let Some(quantizer) = index.quantizer() {
        // mins.len() is the trained dimension, zero while untrained.
        writer.write_all(&(quantizer.mins().len() as u64).to_le_bytes())?;
        for &bound in quantizer.mins() {
            writer.write_all(&bound.to_le_bytes())?;
        }
        for &bound in quantizer.maxs() {
            writer.write_all(&bound.to_le_bytes())?;
        }
    }

    let config = index.config();
    writer.write_all(&(config.m as i32).to_le_bytes())?;
    writer.write_all(&(config.ef_construction as i32).to_le_bytes())?;
    writer.write_all(&(config.ef_search as i32).to_le_bytes())?;
    writer.write_all(&config.metric.ordinal().to_le_bytes())?;

    writer.write_all(&(index.nodes().len() as u64).to_le_bytes())?;
    for node in index.nodes() {
        writer.write_all(&node.id.to_le_bytes())?;
        writer.write_all(&(node.max_layer as i32).to_le_bytes())?;
        for layer_neighbors in &node.neighbors {
            writer.write_all(&(layer_neighbors.len() as u64).to_le_bytes())?;
            for &neighbor_id in layer_neighbors {
                writer.write_all(&(neighbor_id as i32).to_le_bytes())?;
            }
        }
    }

    let storage = index.storage();
    writer.write_all(&(storage.len() as u64).to_le_bytes())?;
    writer.write_all(&(storage.dimension() as u64).to_le_bytes())?;
    for record in 0..storage.len() {
        for &component in storage.vector(record) {
            writer.write_all(&component.to_le_bytes())?;
        }
        let metadata = storage.metadata(record);
        writer.write_all(&(metadata.len() as u64).to_le_bytes())?;
        for (key, value) in metadata {
            writer.write_all(&(key.len() as u64).to_le_bytes())?;
            writer.write_all(key.as_bytes())?;
            writer.write_all(&(value.len() as u64).to_le_bytes())?;
            writer.write_all(value.as_bytes())?;
        }
    }

    writer.write_all(&(index.deleted().len() as u64).to_le_bytes())?;
    for &deleted_id in index.deleted() {
        writer.write_all(&deleted_id.to_le_bytes())?;
    }

    writer.flush()?;
    if sync_mode == SyncMode::Full {
        // Flushing only drains the userspace buffer; durability needs the
        // OS to push the pages down as well.
        writer.get_ref().sync_all()?;
    }

    tracing::info!(
        "saved index to {} ({} nodes, {} tombstones)",
        path.display(),
        index.nodes().len(),
        index.deleted().len()
    );
    Ok(())
}

/// Read an index back from `path`. Returns `None` when the file does not
/// exist.
pub fn load_index(path: &Path) -> Result<Option<Hnsw>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut reader = BufReader::new(file);

    let sq_enabled = read_u8(&mut reader)? != 0;
    let mut quantizer = if sq_enabled {
        let sq_dim = read_u64(&mut reader)? as usize;
        let mut mins = Vec::with_capacity(sq_dim);
        for _ in 0..sq_dim {
            mins.push(read_f32(&mut reader)?);
        }
        let mut maxs = Vec::with_capacity(sq_dim);
        for _ in 0..sq_dim {
            maxs.push(read_f32(&mut reader)?);
        }
        Some(ScalarQuantizer::from_bounds(mins, maxs))
    } else {
        None
    };

    let m = read_i32(&mut reader)?;
    let ef_construction = read_i32(&mut reader)?;
    let ef_search = read_i32(&mut reader)?;
    let metric = DistanceMetric::try_from(read_i32(&mut reader)?)?;
    let config = HnswConfig {
        m: m as usize,
        ef_construction: ef_construction as usize,
        ef_search: ef_search as usize,
        metric,
    };

    let num_nodes = read_u64(&mut reader)? as usize;
    let mut nodes = Vec::with_capacity(num_nodes);
    for _ in 0..num_nodes {
        let id = read_u32(&mut reader)?;
        let max_layer = read_i32(&mut reader)? as usize;
        let mut node = Node::new(id, max_layer);
        for layer in 0..=max_layer {
            let num_neighbors = read_u64(&mut reader)? as usize;
            let mut layer_neighbors = Vec::with_capacity(num_neighbors);
            for _ in 0..num_neighbors {
                layer_neighbors.push(read_i32(&mut reader)? as u32);
            }
            node.neighbors[layer] = layer_neighbors;
        }
        nodes.push(node);
    }

    let num_vectors = read_u64(&mut reader)? as usize;
    if num_vectors != num_nodes {
        return Err(Error::Corrupt(format!(
            "vector count {num_vectors} does not match node count {num_nodes}"
        )));
    }
    let vector_dim = read_u64(&mut reader)? as usize;

    // An untrained quantizer block carries no dimension of its own.
    if let Some(quantizer) = quantizer.as_mut() {
        if !quantizer.is_trained() {
            quantizer.set_dimension(vector_dim);
        }
    }

    let mut storage = VectorStorage::new(vector_dim);
    for _ in 0..num_vectors {
        let mut vector = Vec::with_capacity(vector_dim);
        for _ in 0..vector_dim {
            vector.push(read_f32(&mut reader)?);
        }
        let meta_size = read_u64(&mut reader)? as usize;
        let mut metadata = Metadata::new();
        for _ in 0..meta_size {
            let key = read_string(&mut reader)?;
            let value = read_string(&mut reader)?;
            metadata.insert(key, value);
        }
        storage.push(vector, metadata, quantizer.as_ref())?;
    }

    let num_deleted = read_u64(&mut reader)? as usize;
    let mut deleted = BTreeSet::new();
    for _ in 0..num_deleted {
        deleted.insert(read_u32(&mut reader)?);
    }

    let index = Hnsw::from_parts(config, nodes, storage, deleted, quantizer);
    tracing::info!(
        "loaded index from {} ({} nodes, {} tombstones)",
        path.display(),
        index.nodes().len(),
        index.deleted().len()
    );
    Ok(Some(index))
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f32<R: Read>(reader: &mut R) -> Result<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_u64(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|err| Error::Corrupt(format!("invalid utf-8 string: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(name: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        (dir, path)
    }

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample_index() -> Hnsw {
        let config = HnswConfig {
            m: 4,
            ef_construction: 20,
            ef_search: 10,
            metric: DistanceMetric::Cosine,
        };
        let mut index = Hnsw::new(3, config, None);
        index
            .insert(vec![1.0, 0.0, 0.0], meta(&[("kind", "axis"), ("name", "x")]))
            .unwrap();
        index
            .insert(vec![0.0, 1.0, 0.0], meta(&[("kind", "axis"), ("name", "y")]))
            .unwrap();
        index.insert(vec![0.5, 0.5, 0.0], Metadata::new()).unwrap();
        index.insert(vec![0.9, 0.1, 0.0], meta(&[("kind", "mix")])).unwrap();
        index.mark_deleted(2);
        index
    }

    fn assert_same_state(a: &Hnsw, b: &Hnsw) {
        assert_eq!(a.config().m, b.config().m);
        assert_eq!(a.config().ef_construction, b.config().ef_construction);
        assert_eq!(a.config().ef_search, b.config().ef_search);
        assert_eq!(a.config().metric, b.config().metric);
        assert_eq!(a.nodes(), b.nodes());
        assert_eq!(a.deleted(), b.deleted());
        assert_eq!(a.storage().len(), b.storage().len());
        assert_eq!(a.storage().dimension(), b.storage().dimension());
        for i in 0..a.storage().len() {
            assert_eq!(a.storage().vector(i), b.storage().vector(i));
            assert_eq!(a.storage().metadata(i), b.storage().metadata(i));
        }
    }

    #[test]
    fn test_round_trip() {
        let (_dir, path) = scratch("roundtrip.bin");
        let index = sample_index();
        save_index(&path, &index, SyncMode::Full).unwrap();
        let loaded = load_index(&path).unwrap().unwrap();
        assert_same_state(&index, &loaded);
    }

    #[test]
    fn test_save_is_deterministic() {
        let (_dir, path_a) = scratch("a.bin");
        let (_dir2, path_b) = scratch("b.bin");
        let index = sample_index();
        save_index(&path_a, &index, SyncMode::Off).unwrap();
        save_index(&path_b, &index, SyncMode::Off).unwrap();
        assert_eq!(
            std::fs::read(&path_a).unwrap(),
            std::fs::read(&path_b).unwrap()
        );
    }

    #[test]
    fn test_load_missing_file() {
        let (_dir, path) = scratch("missing.bin");
        assert!(load_index(&path).unwrap().is_none());
    }

    #[test]
    fn test_entry_point_seeded_from_last_node() {
        let (_dir, path) = scratch("entry.bin");
        let index = sample_index();
        save_index(&path, &index, SyncMode::Normal).unwrap();
        let loaded = load_index(&path).unwrap().unwrap();
        assert_eq!(loaded.entry_point(), Some(3));
    }

    #[test]
    fn test_truncated_file_is_io_error() {
        let (_dir, path) = scratch("truncated.bin");
        let index = sample_index();
        save_index(&path, &index, SyncMode::Off).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(load_index(&path), Err(Error::Io(_))));
    }

    #[test]
    fn test_bad_metric_ordinal_rejected() {
        let (_dir, path) = scratch("badmetric.bin");
        let index = sample_index();
        save_index(&path, &index, SyncMode::Off).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        // metric i32 sits after sq_enabled (1) and three i32 params.
        let metric_offset = 1 + 12;
        bytes[metric_offset..metric_offset + 4].copy_from_slice(&9i32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(load_index(&path), Err(Error::UnknownMetric(9))));
    }

    #[test]
    fn test_vector_node_count_mismatch_rejected() {
        let config = HnswConfig::default();
        let mut index = Hnsw::new(2, config, None);
        index.insert(vec![0.0, 0.0], Metadata::new()).unwrap();
        index.insert(vec![1.0, 1.0], Metadata::new()).unwrap();

        let (_dir, path) = scratch("mismatch.bin");
        save_index(&path, &index, SyncMode::Off).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();

        // Walk to num_vectors: header, then both node blocks.
        let mut offset = 1 + 16; // sq_enabled + 4 × i32
        let num_nodes = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
        offset += 8;
        for _ in 0..num_nodes {
            offset += 4; // id
            let max_layer =
                i32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
            offset += 4;
            for _ in 0..=max_layer {
                let count =
                    u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()) as usize;
                offset += 8 + count * 4;
            }
        }
        bytes[offset..offset + 8].copy_from_slice(&99u64.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(load_index(&path), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_trained_quantizer_round_trip() {
        let mut quantizer = ScalarQuantizer::new(2);
        quantizer.train(&[vec![0.0, -1.0], vec![2.0, 3.0]]);
        let mut index = Hnsw::new(2, HnswConfig::default(), Some(quantizer));
        index.insert(vec![1.0, 1.0], Metadata::new()).unwrap();
        index.insert(vec![0.5, 2.0], Metadata::new()).unwrap();

        let (_dir, path) = scratch("quantized.bin");
        save_index(&path, &index, SyncMode::Full).unwrap();
        let loaded = load_index(&path).unwrap().unwrap();

        let quantizer = loaded.quantizer().unwrap();
        assert!(quantizer.is_trained());
        assert_eq!(quantizer.mins(), &[0.0, -1.0]);
        assert_eq!(quantizer.maxs(), &[2.0, 3.0]);
        // Encodings are rebuilt on load for every stored vector.
        assert_eq!(loaded.storage().encoded_len(), 2);
        assert_same_state(&index, &loaded);
    }

    #[test]
    fn test_untrained_quantizer_round_trip() {
        let index = Hnsw::new(
            3,
            HnswConfig::default(),
            Some(ScalarQuantizer::new(3)),
        );
        let (_dir, path) = scratch("untrained.bin");
        save_index(&path, &index, SyncMode::Off).unwrap();
        let loaded = load_index(&path).unwrap().unwrap();
        let quantizer = loaded.quantizer().unwrap();
        assert!(!quantizer.is_trained());
        assert_eq!(quantizer.dimension(), 3);
    }
}
