// ABOUTME: Data model shared by the filesystem and transfer layers.
// ABOUTME: Remote entries and transfer progress events.

mod entry;
mod progress;

pub use entry::{EntryKind, RemoteEntry};
pub(crate) use entry::timestamp;
pub use progress::{ProgressEvent, TransferEvent};
