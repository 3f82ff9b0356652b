pub mod analyzer;
pub mod extraction;
pub mod report;
pub mod scorer;
