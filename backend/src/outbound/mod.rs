//! Outbound adapters implementing domain ports for storage.
//!
//! Adapters are thin translators between domain types and their stored
//! representation. Business outcomes are reported through result codes; only
//! infrastructure faults become port errors.

pub mod persistence;
