// ABOUTME: Shared test support: the scripted fake command runner.
// ABOUTME: Lets pipeline tests run without docker, pack, aws, or kubectl installed.

// Not every test binary exercises every helper.
#[allow(dead_code)]
mod fake_runner;

#[allow(unused_imports)]
pub use fake_runner::{CollectingSink, FakeRunner, Outcome, Rule};
