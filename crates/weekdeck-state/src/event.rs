//! Core self-notification events
//!
//! Everything that re-enters the dashboard core asynchronously -
//! debounce timers firing, in-flight saves completing, change-feed
//! pushes - arrives as one of these on the core's event channel, so
//! all state mutation stays on one logical event loop.

use weekdeck_core::NoteKey;
use weekdeck_gateway::{ChangeEvent, GatewayError, Row};

/// One unit of deferred work for the dashboard core
#[derive(Debug)]
pub enum CoreEvent {
    /// A per-key debounce timer elapsed
    DebounceElapsed(NoteKey),

    /// An in-flight note save completed
    SaveFinished {
        /// Key the save was for
        key: NoteKey,
        /// Text that was written
        text: String,
        /// Stored row on success, surfaced failure otherwise
        outcome: Result<Row, GatewayError>,
    },

    /// The change feed pushed a row change
    Feed(ChangeEvent),
}
