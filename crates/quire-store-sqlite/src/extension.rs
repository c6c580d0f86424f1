//! Static registration of the sqlite-vec extension.

use std::sync::OnceLock;

use rusqlite::ffi;
use sqlite_vec::sqlite3_vec_init;

use crate::{Error, Result};

static REGISTERED: OnceLock<i32> = OnceLock::new();

/// Make `vec0` available on every connection opened afterwards. Must run
/// before `Connection::open`; later calls are free.
pub(crate) fn register_sqlite_vec() -> Result<()> {
  let rc = *REGISTERED.get_or_init(|| {
    // SAFETY: `sqlite3_vec_init` is the extension entry point compiled into
    // the sqlite-vec crate against the same bundled SQLite; the transmute only
    // restores the signature its Rust declaration omits.
    unsafe {
      ffi::sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())))
    }
  });
  if rc == ffi::SQLITE_OK { Ok(()) } else { Err(Error::Extension(rc)) }
}
