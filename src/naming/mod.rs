mod lock;
pub mod node;
pub mod path;
pub mod registry;
pub mod replication;
pub mod service;
pub mod tree;

pub use node::{DirectoryNode, LockMode};
pub use path::sanitize_path;
pub use registry::{Registry, StorageNodeId, StorageNodeInfo};
pub use replication::Replicator;
pub use service::NamingService;
pub use tree::DirectoryTree;
