#[macro_use]
extern crate log;
#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod pipeline;
pub mod runner;
pub mod store;
pub mod types;
pub mod uploader;
pub mod utils;
