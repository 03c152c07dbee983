//! Integration tests for the story pipeline

mod crawl_tests;
mod pipeline_tests;
