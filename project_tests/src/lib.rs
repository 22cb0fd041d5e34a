//! Test support: an in-process fake Yamcs server.

pub mod fake_yamcs;
