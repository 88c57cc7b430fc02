//! Protocol object names.
//!
//! `path` arguments must already be case-escaped (`!`-encoded uppercase).

pub fn list(path: &str) -> String {
    format!("{path}/@v/list")
}

pub fn latest(path: &str) -> String {
    format!("{path}/@latest")
}

pub fn info(path: &str, version: &str) -> String {
    format!("{path}/@v/{version}.info")
}

pub fn module(path: &str, version: &str) -> String {
    format!("{path}/@v/{version}.mod")
}

pub fn archive(path: &str, version: &str) -> String {
    format!("{path}/@v/{version}.zip")
}
