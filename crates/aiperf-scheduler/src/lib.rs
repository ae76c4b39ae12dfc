//! AIPerf Scheduler - credit-issuing strategies and the timing-manager loop
//! that paces them against the worker pool.

pub mod cancellation;
pub mod concurrency;
pub mod fixed_schedule;
pub mod rate;
pub mod request_cancellation;
pub mod scheduler;
pub mod strategy;

pub use concurrency::ConcurrencyStrategy;
pub use fixed_schedule::FixedScheduleStrategy;
pub use rate::RateStrategy;
pub use request_cancellation::RequestCancellationDraw;
pub use scheduler::{PhaseStop, Scheduler, CREDIT_QUEUE};
pub use strategy::{CreditStrategy, CreditTiming};
