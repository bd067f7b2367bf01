//! History records: a finished call paired with its completion time.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::call::{CallDescriptor, CallResult};
use crate::ports::Clock;

/// Identifier assigned by a store on insertion.
///
/// Strictly increasing over the lifetime of a store, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryId(i64);

impl HistoryId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A completed call that has not been given an identifier yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "Request")]
    pub request: CallDescriptor,
    #[serde(rename = "Respond")]
    pub response: CallResult,
    /// When the forwarded call finished (not when the client request arrived).
    /// Microsecond precision, which is what every backend can store.
    #[serde(rename = "Time")]
    pub time: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(request: CallDescriptor, response: CallResult, time: DateTime<Utc>) -> Self {
        Self {
            request,
            response,
            time,
        }
    }

    /// Stamp a finished call with the clock's current time.
    ///
    /// Must be called right after the upstream response has been read,
    /// so that the timestamp reflects completion order. Sub-microsecond
    /// digits are dropped.
    pub fn complete(request: CallDescriptor, response: CallResult, clock: &dyn Clock) -> Self {
        Self::new(request, response, clock.now().trunc_subsecs(6))
    }
}

/// A stored entry together with its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "ID")]
    pub id: HistoryId,
    #[serde(rename = "Element")]
    pub entry: HistoryEntry,
}

impl HistoryRecord {
    pub fn new(id: HistoryId, entry: HistoryEntry) -> Self {
        Self { id, entry }
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.entry.time
    }
}
