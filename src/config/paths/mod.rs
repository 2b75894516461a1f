//! Filesystem locations of configuration.

pub mod xdg_root;
