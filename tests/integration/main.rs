//! Integration tests for tool-guardrails

mod cache_tests;
mod classifier_tests;
mod masking_tests;
mod pipeline_tests;
