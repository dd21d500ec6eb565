//! HTTP client for the wallet demo page's JSON API.

mod client;

pub use client::{DemoPageClient, Health, PageState};
