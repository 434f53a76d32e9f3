pub mod logger;
pub mod staging;
