//! Helper crate enabling a device feature for workspace-wide builds; see `Cargo.toml`.

#![no_std]
