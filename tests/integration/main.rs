//! Integration tests: the engine, stores and HTTP API exercised through
//! the public crate surface only.

mod api;
mod mock_store;
