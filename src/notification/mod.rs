//! Delivery of circular text to notification services.
//!
//! The dispatcher talks to a [`crate::core::NotificationSink`] only; this
//! module provides the concrete Slack implementation.

pub mod slack;
