pub mod archive;
pub mod metadata;
pub mod pipeline;
pub mod relay;
pub mod staging;
pub mod sweeper;
