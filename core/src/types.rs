//! Shared primitive types used across the entire analysis engine.

/// A stable, unique identifier for a customer.
pub type CustomerId = String;
