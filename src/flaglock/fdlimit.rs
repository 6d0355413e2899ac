// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! `setrlimit(RLIMIT_NOFILE)` wrapper for processes that expect to hold many
//! simultaneous flag-lock file descriptors or pipe-backed sockets at once.
//!
//! Grounded in `original_source/LibFilesys.cpp`'s `maxFdsSet`. Not wired into any
//! `Processing` automatically; callers raise the limit during their own startup.

#[cfg(unix)]
pub fn raise_fd_limit(target: u64) -> std::io::Result<()> {
    use rlimit::Resource;

    let (soft, hard) = Resource::NOFILE.get()?;
    let new_soft = target.min(hard).max(soft);
    Resource::NOFILE.set(new_soft, hard)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn raise_fd_limit(_target: u64) -> std::io::Result<()> {
    Ok(())
}
