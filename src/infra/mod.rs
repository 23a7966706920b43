// ============================================================================
// Infrastructure Ports
// ============================================================================

pub mod mapper;

pub use mapper::DomainMapper;
