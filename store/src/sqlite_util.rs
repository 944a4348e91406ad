//! Shared SQLite and secure-filesystem helpers for the store.
//!
//! - Secure directory creation and Unix permission tightening
//! - Secure database file creation (and WAL/SHM sidecars)
//! - Column codecs for ids, enums and timestamps stored as text

use std::fs::{self, OpenOptions, Permissions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{Connection, Error as SqlError, ErrorCode, Row, ffi};
use uuid::Uuid;

use crate::Write;

/// Create the parent directory (0o700) and the database file (0o600).
pub(crate) fn prepare_db_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_secure_dir(parent)?;
    }
    ensure_secure_db_files(path)
}

/// Creates the directory (and parents) if missing, then on Unix tightens
/// permissions to 0o700 if the directory is owned by the current user.
pub(crate) fn ensure_secure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to read directory metadata: {}", path.display()))?;

        let our_uid = unsafe { libc::getuid() };
        if metadata.uid() != our_uid {
            return Ok(());
        }

        let current_mode = metadata.permissions().mode() & 0o777;
        if current_mode & 0o077 != 0 {
            fs::set_permissions(path, Permissions::from_mode(0o700)).with_context(
                || format!("Failed to set directory permissions: {}", path.display()),
            )?;
        }
    }
    Ok(())
}

/// Pre-existing files and sidecars are permission-tightened unconditionally.
pub(crate) fn ensure_secure_db_files(path: &Path) -> Result<()> {
    if !path.exists() {
        let mut options = OpenOptions::new();
        options.create(true).truncate(false).read(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let _file = options
            .open(path)
            .with_context(|| format!("Failed to create database file: {}", path.display()))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set database permissions: {}", path.display()))?;
        for suffix in ["-wal", "-shm"] {
            let sidecar = sqlite_sidecar_path(path, suffix);
            if sidecar.exists() {
                let _ = fs::set_permissions(&sidecar, Permissions::from_mode(0o600));
            }
        }
    }

    Ok(())
}

fn sqlite_sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path.file_name().map(|name| name.to_string_lossy());
    match file_name {
        Some(name) => path.with_file_name(format!("{name}{suffix}")),
        None => PathBuf::from(format!("{}{suffix}", path.display())),
    }
}

// ── Column codecs ───────────────────────────────────────────────────────

/// Fixed-width `YYYY-MM-DDTHH:MM:SS.mmmZ`, so text order is time order.
pub(crate) fn ts(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn opt_ts(time: Option<DateTime<Utc>>) -> Option<String> {
    time.map(ts)
}

fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Registers `fold(text)`, a Unicode lowercase. Built-in `LIKE` and
/// `lower()` only fold ASCII.
pub(crate) fn register_fold(db: &Connection) -> rusqlite::Result<()> {
    db.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
    )
}

/// True when the statement failed on a UNIQUE or PRIMARY KEY constraint.
pub(crate) fn is_unique_violation(err: &SqlError) -> bool {
    matches!(
        err,
        SqlError::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
    )
}

/// Classify the row count of a guarded INSERT or UPDATE.
pub(crate) fn write_outcome(result: rusqlite::Result<usize>) -> rusqlite::Result<Write> {
    match result {
        Ok(0) => Ok(Write::Missing),
        Ok(_) => Ok(Write::Done),
        Err(err) if is_unique_violation(&err) => Ok(Write::Duplicate),
        Err(err) => Err(err),
    }
}

fn conversion_error(idx: usize, raw: &str) -> SqlError {
    SqlError::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unexpected column value {raw:?}").into(),
    )
}

/// Read a text column and map it through `parse`.
pub(crate) fn text_col<T>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, &raw))
}

/// Nullable variant of [`text_col`].
pub(crate) fn opt_text_col<T>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> Option<T>,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(raw) => parse(&raw).map(Some).ok_or_else(|| conversion_error(idx, &raw)),
        None => Ok(None),
    }
}

pub(crate) fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    text_col(row, idx, |raw| Uuid::parse_str(raw).ok())
}

pub(crate) fn opt_uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    opt_text_col(row, idx, |raw| Uuid::parse_str(raw).ok())
}

pub(crate) fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    text_col(row, idx, parse_ts)
}

pub(crate) fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    opt_text_col(row, idx, parse_ts)
}
