//! Transfer session controller
//!
//! The finite-state machine at the heart of the appliance:
//!
//! ```text
//!            source + 1 drive             dest + 2 drives            button
//!   Empty ───────────────────▶ SourceConnected ─────────────▶ BothConnected ──────▶ Processing
//!     ▲  │ unknown / wrong order      │ unknown       ▲  device removed │                │
//!     │  └───────────▶ Problem ◀──────┘               └─────────────────┘                ▼
//!     │                   │                                                            Done
//!     │  all removed      ▼                            button                            │
//!     └─────────────── Filled ◀──────────────────────────────────────────────────────────┘
//! ```
//!
//! The controller owns all session data; the hardware it talks to is handed in on every
//! call through [`Hardware`].

mod machine;
mod state;

pub use machine::{Controller, Hardware};
pub use state::{DestinationSide, SourceSide, State, TransferPlan};
