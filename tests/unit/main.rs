//! Unit test suite

mod config_test;
mod generation_test;
mod metrics_test;
