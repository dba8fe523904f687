//! Snapshot engine
//!
//! Archive layout: `plugin_state.tar.gz`, a gzip tar holding one entry named
//! `plugin` whose content is the JSON `RegistrySnapshot`. The CRC-64/ECMA-182
//! of the uncompressed JSON is recorded as lowercase hex under the file
//! metadata key `checksum`.
//!
//! Save and load both hold the processor's lock exclusively, so no apply can
//! interleave with a snapshot.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use crc::{Crc, CRC_64_ECMA_182};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::RwLock;
use plugin_model::RegistrySnapshot;
use tracing::{error, info, warn};

use crate::consensus::{
    LocalFileMeta, SnapshotCallback, SnapshotOperation, SnapshotReader, SnapshotWriter,
};
use crate::error::{PluginError, Result};
use crate::manager::PluginStateApplier;
use crate::persistence::PluginStatePersistence;

/// Archive file name inside a snapshot directory
pub const SNAPSHOT_ARCHIVE: &str = "plugin_state.tar.gz";
/// Name of the single entry inside the archive
pub const SNAPSHOT_ENTRY: &str = "plugin";
/// Metadata key holding the payload checksum
pub const CHECKSUM_KEY: &str = "checksum";

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

// ============================================================================
// Archive Codec
// ============================================================================

/// CRC-64/ECMA-182 of `bytes`
pub fn checksum(bytes: &[u8]) -> u64 {
    CRC64.checksum(bytes)
}

pub fn format_checksum(value: u64) -> String {
    format!("{:x}", value)
}

/// Compress `payload` into a single-entry archive at `path`; returns its checksum
pub fn write_archive(path: &Path, payload: &[u8]) -> Result<u64> {
    let write = || -> io::Result<()> {
        let file = File::create(path)?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        builder.append_data(&mut header, SNAPSHOT_ENTRY, payload)?;

        let file = builder.into_inner()?.finish()?;
        file.sync_all()
    };
    write().map_err(|e| {
        PluginError::SnapshotIo(format!("Failed to write {}: {}", path.display(), e))
    })?;
    Ok(checksum(payload))
}

/// Decompress the archive at `path`; returns the payload and its checksum
pub fn read_archive(path: &Path) -> Result<(Vec<u8>, u64)> {
    let read = || -> io::Result<Option<Vec<u8>>> {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(path)?));
        let mut payload = None;
        for entry in archive.entries()? {
            let mut entry = entry?;
            if payload.is_none() && entry.path()?.as_ref() == Path::new(SNAPSHOT_ENTRY) {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf)?;
                payload = Some(buf);
            }
        }
        // Drain to the gzip trailer so its own CRC is verified too
        io::copy(&mut archive.into_inner(), &mut io::sink())?;
        Ok(payload)
    };

    let payload = read()
        .map_err(|e| PluginError::SnapshotIo(format!("Failed to read {}: {}", path.display(), e)))?
        .ok_or_else(|| {
            PluginError::SnapshotIo(format!(
                "{} has no '{}' entry",
                path.display(),
                SNAPSHOT_ENTRY
            ))
        })?;
    let sum = checksum(&payload);
    Ok((payload, sum))
}

/// Serialize `snapshot` into the writer's directory and record its checksum
///
/// Returns the writer's verdict on recording the file.
pub fn write_snapshot(writer: &dyn SnapshotWriter, snapshot: &RegistrySnapshot) -> Result<bool> {
    let payload = snapshot.to_bytes()?;
    let sum = write_archive(&writer.path().join(SNAPSHOT_ARCHIVE), &payload)?;
    let meta = LocalFileMeta::new().append(CHECKSUM_KEY, format_checksum(sum));
    Ok(writer.add_file(SNAPSHOT_ARCHIVE, meta))
}

/// Read and verify the snapshot in the reader's directory
///
/// A missing checksum is logged and tolerated; a mismatch is an error.
pub fn read_snapshot(reader: &dyn SnapshotReader) -> Result<RegistrySnapshot> {
    let (payload, actual) = read_archive(&reader.path().join(SNAPSHOT_ARCHIVE))?;
    let actual = format_checksum(actual);

    match reader
        .file_meta(SNAPSHOT_ARCHIVE)
        .and_then(|meta| meta.get(CHECKSUM_KEY).map(str::to_string))
    {
        Some(expected) if expected.eq_ignore_ascii_case(&actual) => {},
        Some(expected) => {
            error!(
                "[Snapshot] Checksum mismatch: expected {}, actual {}",
                expected, actual
            );
            return Err(PluginError::SnapshotIntegrity { expected, actual });
        },
        None => {
            warn!("[Snapshot] No checksum metadata, snapshot integrity not verified");
        },
    }

    Ok(RegistrySnapshot::from_bytes(&payload)?)
}

// ============================================================================
// Snapshot Operation
// ============================================================================

/// Saves and restores the plugin registry for log compaction
pub struct PluginStateSnapshotOperation {
    applier: Arc<dyn PluginStateApplier>,
    persistence: Arc<dyn PluginStatePersistence>,
    lock: Arc<RwLock<()>>,
}

impl PluginStateSnapshotOperation {
    pub fn new(
        applier: Arc<dyn PluginStateApplier>,
        persistence: Arc<dyn PluginStatePersistence>,
        lock: Arc<RwLock<()>>,
    ) -> Self {
        Self {
            applier,
            persistence,
            lock,
        }
    }

    /// Capture persisted state into the writer's directory
    pub fn save(&self, writer: &dyn SnapshotWriter) -> Result<bool> {
        let _guard = self.lock.write();

        let snapshot = RegistrySnapshot::new(
            self.persistence.load_all_states()?,
            self.persistence.load_all_configs()?,
        );
        let recorded = write_snapshot(writer, &snapshot)?;

        info!(
            "[Snapshot] Saved plugin state snapshot: {} state(s), {} config(s)",
            snapshot.state_count(),
            snapshot.config_count()
        );
        Ok(recorded)
    }

    /// Verify, then apply and persist every entry of the snapshot
    ///
    /// Nothing is touched unless the archive reads back intact.
    pub fn load(&self, reader: &dyn SnapshotReader) -> Result<()> {
        let _guard = self.lock.write();

        let snapshot = read_snapshot(reader)?;

        if let Some(states) = &snapshot.states {
            for (plugin_id, enabled) in states {
                let effective = self.applier.apply_state_change(plugin_id, *enabled)?;
                self.persistence.save_state(plugin_id, effective)?;
            }
        }
        if let Some(configs) = &snapshot.configs {
            for (plugin_id, config) in configs {
                self.persistence.save_config(plugin_id, config)?;
                self.applier.apply_config_change(plugin_id, config)?;
            }
        }

        info!(
            "[Snapshot] Loaded plugin state snapshot: {} state(s), {} config(s)",
            snapshot.state_count(),
            snapshot.config_count()
        );
        Ok(())
    }
}

impl SnapshotOperation for PluginStateSnapshotOperation {
    fn on_snapshot_save(&self, writer: &dyn SnapshotWriter, done: SnapshotCallback) {
        match self.save(writer) {
            Ok(recorded) => done(recorded, None),
            Err(e) => {
                error!("[Snapshot] Failed to save plugin state snapshot: {}", e);
                done(false, Some(e));
            },
        }
    }

    fn on_snapshot_load(&self, reader: &dyn SnapshotReader) -> bool {
        match self.load(reader) {
            Ok(()) => true,
            Err(e) => {
                error!("[Snapshot] Failed to load plugin state snapshot: {}", e);
                false
            },
        }
    }
}
