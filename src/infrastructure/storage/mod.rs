mod memory_gateway;
mod s3_gateway;

pub use memory_gateway::MemoryGateway;
pub use s3_gateway::{S3Gateway, S3GatewayConfig};
