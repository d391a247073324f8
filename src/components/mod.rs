pub mod history;

pub use history::{Controller, DEFAULT_CAPACITY, Version};
