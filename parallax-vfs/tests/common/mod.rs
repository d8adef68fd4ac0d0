//! Shared helpers for facade tests.
//!
//! The facade routes through a process-wide mount table, so every test that
//! touches it runs under one lock and starts from a cleared manager.

use once_cell::sync::Lazy;
use parallax_vfs as vfs;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(Mutex::default);

fn init_logging() {
    let targets = Targets::new().with_target("parallax::vfs", tracing::Level::DEBUG);
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer().with_filter(targets))
        .try_init();
}

/// Runs `f` with a fresh in-memory tree mounted at `//test` and the working
/// directory set to `//test/`.
pub fn with_test_tree<F: FnOnce()>(f: F) {
    let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    init_logging();
    vfs::manager().clear();
    vfs::manager().install_tree("//test", Arc::new(vfs::MemoryTree::new()));
    vfs::set_current_path("//test/").unwrap();
    f();
    vfs::manager().clear();
}

/// Runs `f` with a cleared manager and no mounted trees.
pub fn with_clean_manager<F: FnOnce()>(f: F) {
    let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    init_logging();
    vfs::manager().clear();
    f();
    vfs::manager().clear();
}

pub fn create_file(path: &str, contents: &str) {
    let mut out = vfs::open_writer(path).unwrap();
    out.write_all(contents.as_bytes()).unwrap();
    out.close().unwrap();
}

pub fn file_contents(path: &str) -> String {
    let mut contents = String::new();
    vfs::open_reader(path)
        .unwrap()
        .read_to_string(&mut contents)
        .unwrap();
    contents
}
