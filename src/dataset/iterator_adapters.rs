pub mod batching;
pub mod sharding;
pub mod shuffling;

pub use batching::Batching;
pub use sharding::shard_indices;
pub use shuffling::Shuffling;
