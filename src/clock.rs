//! Wall-clock access, isolated behind one function so scheduling logic
//! stays testable against fixed `utc_now` values (see `scheduler.rs`'s
//! unit tests, which never call this).

use std::time::{SystemTime, UNIX_EPOCH};

use crate::ids::UnixSeconds;

pub fn unix_now() -> UnixSeconds {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}
