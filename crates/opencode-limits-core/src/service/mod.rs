//! Fetch orchestration and cache-aware resolution.

mod fetcher;
mod resolver;

pub use fetcher::{
    fetch_all, fetch_event_channel, FetchEvent, FetchEventReceiver, FetchEventSender, FetchReport,
};
pub use resolver::{resolve_usage, ResolvedUsage, UsageOrigin};
