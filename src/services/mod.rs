pub mod cache;

pub use cache::CsvCache;
