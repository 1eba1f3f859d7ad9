mod commit;
mod diff;
mod job;
mod phrase;
mod snapshot;
mod status;

pub use commit::CommitRecord;
pub use diff::{DiffEntry, DiffState, PhraseDiff};
pub use job::{Job, DEFAULT_QUEUE};
pub use phrase::{IndexKey, Phrase, PhraseFragment};
pub use snapshot::Snapshot;
pub use status::{Event, FINISHED_STATUS, Status, TransitionError, UnknownStatus};
