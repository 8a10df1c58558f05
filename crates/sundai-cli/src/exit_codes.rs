//! Process exit codes.
//!
//! Cache failures exit with [`sundai_cache::CacheError::exit_code`]; the
//! constants below cover everything else.

pub const SUCCESS: i32 = 0;
pub const INTERNAL_ERROR: i32 = 2; // Unexpected failure outside the cache (I/O, output)
