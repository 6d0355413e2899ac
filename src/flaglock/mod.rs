// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! Cross-process named locks backed only by the filesystem.
//!
//! A single base directory holds one `.lock` file used for an advisory, non-blocking
//! exclusive file lock (via [`fs2::FileExt`]), and zero or more marker files whose names
//! *are* the held resource names. Taking the file lock, checking for marker absence,
//! creating the markers, and releasing the file lock is the whole protocol — see
//! `SPEC_FULL.md` §4.5, grounded in `original_source/LibFilesys.cpp`'s
//! `sysFlagsIntLock`/`sysFlagsIntUnlock`.

mod fdlimit;

pub use fdlimit::raise_fd_limit;

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;

use crate::error::CoreError;
use crate::progress::Progress;

/// One resource name held by some `Processing` in this process, tracked so it can be
/// released with [`LockDir::flags_unlock`].
///
/// `kind` mirrors `original_source/LibFilesys.cpp`'s `UserLock::type` — the original
/// always constructs it as `0` and never branches on it; kept here for layout fidelity
/// with `SPEC_FULL.md` §3 rather than because this crate gives it meaning yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLock {
    pub kind: u32,
    pub resource_name: String,
}

/// Process-wide bookkeeping for one held flag, including the call site that acquired
/// it — mirrors `original_source/LibFilesys.cpp`'s `GlobalLock`, whose
/// `filename`/`function`/`line` come from the `__PROC_FILENAME__`/`__FUNCTION__`/
/// `__LINE__` macro expansion at the call site.
struct GlobalLockEntry {
    owner: String,
    file: String,
    function: String,
    line: u32,
    resource_name: String,
}

/// A process's handle onto one flag-lock base directory.
///
/// Each process that wants to participate in the same named-lock space opens its own
/// `LockDir` against the same `base_dir`; `lock_dir_open` is safe to call once per
/// process (or, in tests, once per simulated process).
pub struct LockDir {
    id: uuid::Uuid,
    base_dir: PathBuf,
    file: File,
    global: Mutex<HashMap<String, GlobalLockEntry>>,
}

impl LockDir {
    /// Opens (creating if missing) the `.lock` file under `base_dir`.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self, CoreError> {
        let id = uuid::Uuid::new_v4();
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir).map_err(|source| CoreError::LockDirOpen {
            path: base_dir.clone(),
            source,
        })?;

        let lock_path = base_dir.join(".lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|source| CoreError::LockDirOpen { path: lock_path, source })?;

        tracing::debug!(%id, base_dir = %base_dir.display(), "lock directory opened");
        Ok(Self { id, base_dir, file, global: Mutex::new(HashMap::new()) })
    }

    /// This process's identity in flag-lock diagnostics, independent of `requester`
    /// strings callers pass to `flags_lock` — useful when a process opens more than one
    /// `LockDir` and wants to tell them apart in logs.
    #[must_use]
    pub fn id(&self) -> uuid::Uuid { self.id }

    #[must_use]
    pub fn base_dir(&self) -> &Path { &self.base_dir }

    /// Attempts to acquire every name in `names` for `requester`, all-or-nothing.
    /// `file`/`function`/`line` identify the call site, recorded in the global
    /// bookkeeping map for diagnostics (`SPEC_FULL.md` §3's `GlobalLock`).
    ///
    /// Matches `original_source/LibFilesys.cpp`'s `sysFlagsIntLock` return contract:
    /// `Pending` on contention (file lock unavailable, or a requested marker already
    /// held), `Positive` once every marker is created and recorded, `Err` on filesystem
    /// failure.
    pub fn flags_lock(
        &self,
        requester: &str,
        file: &str,
        function: &str,
        line: u32,
        names: &[&str],
        locks: &mut Vec<UserLock>,
    ) -> Progress {
        if FileExt::try_lock_exclusive(&self.file).is_err() {
            return Progress::Pending;
        }

        // From here on the file lock is held; every exit path below must release it.
        let result = self.check_and_create_markers(names);
        let _ = FileExt::unlock(&self.file);

        match result {
            Err(source) => {
                tracing::error!(base_dir = %self.base_dir.display(), %source, "failed to create flag-lock marker");
                Progress::err(-1)
            }
            Ok(false) => Progress::Pending,
            Ok(true) => {
                let mut global = self.global.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                for name in names {
                    locks.push(UserLock { kind: 0, resource_name: (*name).to_owned() });
                    global.insert(
                        (*name).to_owned(),
                        GlobalLockEntry {
                            owner: requester.to_owned(),
                            file: file.to_owned(),
                            function: function.to_owned(),
                            line,
                            resource_name: (*name).to_owned(),
                        },
                    );
                    tracing::debug!(resource = *name, owner = requester, file, function, line, "flag lock acquired");
                }
                Progress::Positive
            }
        }
    }

    fn check_and_create_markers(&self, names: &[&str]) -> std::io::Result<bool> {
        for name in names {
            if self.marker_path(name).exists() {
                return Ok(false);
            }
        }
        for name in names {
            std::fs::File::create(self.marker_path(name))?;
        }
        Ok(true)
    }

    /// Releases every lock in `locks`, removing their markers and clearing them from the
    /// global bookkeeping map. No file lock is required: markers are only ever removed
    /// by their owner.
    pub fn flags_unlock(&self, locks: &mut Vec<UserLock>) {
        if locks.is_empty() {
            return;
        }

        {
            let mut global = self.global.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            for lock in locks.iter() {
                global.remove(&lock.resource_name);
            }
        }

        for lock in locks.drain(..) {
            let path = self.marker_path(&lock.resource_name);
            if let Err(source) = std::fs::remove_file(&path) {
                if source.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), %source, "failed to remove flag-lock marker");
                }
            }
        }
    }

    fn marker_path(&self, name: &str) -> PathBuf { self.base_dir.join(name) }

    /// True iff the named marker currently exists on disk, regardless of which process
    /// (or `LockDir` instance) owns it. Mainly useful in tests.
    #[must_use]
    pub fn is_held(&self, name: &str) -> bool { self.marker_path(name).exists() }

    /// Diagnostic lookup: who (according to *this process's* bookkeeping) holds `name`,
    /// and at which call site it was acquired. Returns `None` both when the name is
    /// free and when it's held by a lock this `LockDir` never recorded (e.g. acquired by
    /// another process).
    #[must_use]
    pub fn held_since(&self, name: &str) -> Option<(String, String, String, u32)> {
        let global = self.global.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        global
            .get(name)
            .map(|entry| (entry.owner.clone(), entry.file.clone(), entry.function.clone(), entry.line))
    }
}
