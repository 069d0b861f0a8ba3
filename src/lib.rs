pub mod acl;
pub mod config;
pub mod errors;
pub mod proxy;
pub mod tls;
