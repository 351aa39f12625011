//! Integration test harness

mod scrape_tests;
mod server_tests;
