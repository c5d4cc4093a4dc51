//! Core library for bodyline.
//!
//! The producer side walks a directory and serializes one body file record
//! per entry ([`collect`], [`body`]). The consumer side reads records back,
//! filters them by time ([`stream`], [`filter`]) and renders a MACB timeline
//! ([`timeline`]).

pub mod body;
pub mod collect;
pub mod errlog;
pub mod filter;
pub mod record;
pub mod stat;
pub mod stream;
pub mod timeline;

pub use collect::Collector;
pub use errlog::{ErrorLog, ErrorSink, SkippedEntry};
pub use filter::{FilterError, FilterExpression};
pub use record::{Mode, Principal, RecordError, RecordPath, TimelineRecord, TimestampClass};
pub use stat::{EntryAccessError, PlatformStatProvider, StatProvider};
pub use stream::{RecordStream, StreamError, TimestampedEntry};
pub use timeline::Emitter;
