#[cfg(test)]
pub mod memory;
mod pool;
pub mod postgres;
pub mod store;

pub use pool::create_pool;
