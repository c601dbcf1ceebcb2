pub mod paths;
pub mod persistence;
pub mod schema;

pub use paths::*;
pub use persistence::*;
pub use schema::*;

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_registration_bind() -> String {
    "127.0.0.1:8090".to_string()
}

fn default_read_threshold() -> u32 {
    20
}

fn default_replication_enabled() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    5000
}
