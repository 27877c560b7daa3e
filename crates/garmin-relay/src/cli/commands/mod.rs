pub mod collect;
pub mod report;

pub use collect::run as collect;
pub use report::run as report;
