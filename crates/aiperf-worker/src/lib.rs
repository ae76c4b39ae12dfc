//! AIPerf Worker - pulls credits off the bus, drives one request per
//! credit through the configured inference client, and reports the
//! resulting record plus credit return.

pub mod health;
pub mod pool;
pub mod worker;

pub use pool::WorkerPool;
pub use worker::{Worker, REQUEST_RECORD_QUEUE};
