//! Outbound delivery of engine results.

pub mod notification_sink;
