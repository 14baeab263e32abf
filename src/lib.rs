pub mod app;
pub mod assemble;
pub mod branches;
pub mod config;
pub mod domain;
pub mod edges;
pub mod error;
pub mod fetch;
pub mod fs_util;
pub mod hydrate;
pub mod openalex;
pub mod output;
pub mod progress;
pub mod rank;
pub mod roots;
