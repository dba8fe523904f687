//! Replicated Plugin State
//!
//! Keeps the enabled flag and configuration of every plugin identical on all
//! cluster nodes. Changes are validated by the coordinator, committed through
//! an external consensus protocol and applied on every node by the consensus
//! adapter; the snapshot engine compacts the log into a checksummed archive.
//!
//! ```text
//!  admin call ──► PluginManager ──► PluginStateSynchronizer ──► CpProtocol
//!                   ▲   (validate)     (Raft / Standalone)          │
//!                   │                                               │ commit
//!                   │ apply                                         ▼
//!                   └───────────── PluginStateProcessor ◄───────────┘
//!                                    │ persist     │ save/load
//!                                    ▼             ▼
//!                        PluginStatePersistence   PluginStateSnapshotOperation
//! ```
//!
//! # Key Components
//!
//! - **PluginManager**: registry, validation and the apply path
//! - **PluginStateProcessor**: state machine endpoint of the replication group
//! - **PluginStateSnapshotOperation**: gzip tar archive with a CRC-64 checksum
//! - **PluginStatePersistence**: file and in-memory backends
//! - **PluginStateNode**: bootstrap wiring for standalone and clustered nodes

pub mod checker;
pub mod config;
pub mod consensus;
pub mod critical;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod node;
pub mod persistence;
pub mod plugin;
pub mod processor;
pub mod snapshot;
pub mod sync;

// Re-export public API
pub use checker::{AlwaysEnabled, PluginStateChecker};
pub use config::RegistrySettings;
pub use consensus::{
    CpProtocol, DirectorySnapshotStore, LocalFileMeta, ReadRequest, RequestProcessor, Response,
    SnapshotCallback, SnapshotOperation, SnapshotReader, SnapshotWriter, WriteRequest,
};
pub use critical::{CriticalPlugins, BUILTIN_CRITICAL_PLUGINS};
pub use discovery::{DiscoveredPlugin, PluginDiscovery};
pub use error::{ErrorKind, PluginError, Result};
pub use manager::{PluginManager, PluginStateApplier};
pub use node::PluginStateNode;
pub use persistence::{FilePersistence, MemoryPersistence, PluginStatePersistence};
pub use plugin::{ConfigurablePlugin, Plugin, PluginInstance, PluginProvider};
pub use processor::PluginStateProcessor;
pub use snapshot::PluginStateSnapshotOperation;
pub use sync::{PluginStateSynchronizer, RaftSynchronizer, StandaloneSynchronizer};
