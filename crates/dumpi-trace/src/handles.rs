//! Well-known handle sentinels and runtime handle hashing.
//!
//! Opaque runtime handles are stored as small integers. Predefined global objects use the fixed
//! sentinels below; every other handle gets the next dense value starting at its class's
//! `FIRST_USER` value.

use std::collections::HashMap;

pub mod comm {
    pub const ERROR: i32 = 0;
    pub const NULL: i32 = 1;
    pub const WORLD: i32 = 2;
    pub const SELF: i32 = 3;
    pub const FIRST_USER: i32 = 4;
}

pub mod datatype {
    pub const ERROR: i32 = 0;
    pub const NULL: i32 = 1;
    pub const CHAR: i32 = 2;
    pub const UNSIGNED_CHAR: i32 = 3;
    pub const BYTE: i32 = 4;
    pub const SHORT: i32 = 5;
    pub const UNSIGNED_SHORT: i32 = 6;
    pub const INT: i32 = 7;
    pub const UNSIGNED: i32 = 8;
    pub const LONG: i32 = 9;
    pub const UNSIGNED_LONG: i32 = 10;
    pub const FLOAT: i32 = 11;
    pub const DOUBLE: i32 = 12;
    pub const LONG_DOUBLE: i32 = 13;
    pub const LONG_LONG: i32 = 14;
    pub const PACKED: i32 = 15;
    pub const FIRST_USER: i32 = 16;
}

pub mod request {
    pub const ERROR: i32 = 0;
    pub const NULL: i32 = 1;
    pub const FIRST_USER: i32 = 2;
}

pub mod group {
    pub const ERROR: i32 = 0;
    pub const NULL: i32 = 1;
    pub const EMPTY: i32 = 2;
    pub const FIRST_USER: i32 = 3;
}

pub mod op {
    pub const ERROR: i32 = 0;
    pub const NULL: i32 = 1;
    pub const MAX: i32 = 2;
    pub const MIN: i32 = 3;
    pub const SUM: i32 = 4;
    pub const PROD: i32 = 5;
    pub const LAND: i32 = 6;
    pub const BAND: i32 = 7;
    pub const LOR: i32 = 8;
    pub const BOR: i32 = 9;
    pub const LXOR: i32 = 10;
    pub const BXOR: i32 = 11;
    pub const MINLOC: i32 = 12;
    pub const MAXLOC: i32 = 13;
    pub const FIRST_USER: i32 = 14;
}

pub mod file {
    pub const ERROR: i32 = 0;
    pub const NULL: i32 = 1;
    pub const FIRST_USER: i32 = 2;
}

/// Maps runtime handle values of one class to their stored integers.
#[derive(Debug, Clone)]
pub struct HandleInterner {
    next: i32,
    predefined: HashMap<u64, i32>,
    assigned: HashMap<u64, i32>,
}

impl HandleInterner {
    pub fn new(first_user: i32) -> Self {
        Self {
            next: first_user,
            predefined: HashMap::new(),
            assigned: HashMap::new(),
        }
    }

    /// Pin a runtime handle (e.g. the address of a predefined communicator) to a sentinel.
    pub fn with_predefined(mut self, raw: u64, sentinel: i32) -> Self {
        self.predefined.insert(raw, sentinel);
        self
    }

    /// Stored value for `raw`, assigning the next dense value on first sight.
    pub fn intern(&mut self, raw: u64) -> i32 {
        if let Some(&sentinel) = self.predefined.get(&raw) {
            return sentinel;
        }
        if let Some(&value) = self.assigned.get(&raw) {
            return value;
        }
        let value = self.next;
        self.next = self.next.saturating_add(1);
        self.assigned.insert(raw, value);
        value
    }

    /// Stored value for `raw` if it is predefined or currently interned.
    pub fn get(&self, raw: u64) -> Option<i32> {
        self.predefined
            .get(&raw)
            .or_else(|| self.assigned.get(&raw))
            .copied()
    }

    /// Forget a user handle (e.g. after `MPI_Comm_free`). Stored values are never reused, so a
    /// runtime that recycles the raw value gets a fresh integer on the next `intern`.
    pub fn release(&mut self, raw: u64) -> Option<i32> {
        self.assigned.remove(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_handles_map_to_sentinels() {
        let mut comms = HandleInterner::new(comm::FIRST_USER)
            .with_predefined(0x1000, comm::WORLD)
            .with_predefined(0x2000, comm::SELF);
        assert_eq!(comms.intern(0x1000), comm::WORLD);
        assert_eq!(comms.intern(0x2000), comm::SELF);
        assert_eq!(comms.intern(0xdead), comm::FIRST_USER);
    }

    #[test]
    fn user_handles_are_dense_and_stable() {
        let mut requests = HandleInterner::new(request::FIRST_USER);
        let a = requests.intern(0xa0);
        let b = requests.intern(0xb0);
        assert_eq!((a, b), (request::FIRST_USER, request::FIRST_USER + 1));
        assert_eq!(requests.intern(0xa0), a);
        assert_eq!(requests.get(0xb0), Some(b));
        assert_eq!(requests.get(0xc0), None);
    }

    #[test]
    fn released_raw_values_get_fresh_integers() {
        let mut types = HandleInterner::new(datatype::FIRST_USER);
        let first = types.intern(7);
        assert_eq!(types.release(7), Some(first));
        assert_eq!(types.get(7), None);
        assert_ne!(types.intern(7), first);
    }
}
