pub mod machine;
pub mod scoring;
pub mod types;
