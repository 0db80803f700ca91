//! Foundation utilities shared by the harness and its consumers

pub mod logging;
