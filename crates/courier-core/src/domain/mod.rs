//! Domain model (calls, history records, paging, errors).
//!
//! ここにある型は ports / impls / app のすべてから共有されます。
//! I/O には依存しません。

pub mod call;
pub mod errors;
pub mod page;
pub mod record;

pub use call::{CallDescriptor, CallMethod, CallResult, HeaderMultiMap};
pub use errors::{ErrorKind, ForwardError, StoreError};
pub use page::Page;
pub use record::{HistoryEntry, HistoryId, HistoryRecord};
