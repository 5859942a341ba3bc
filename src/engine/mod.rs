//! Trip engine with deterministic replay semantics.
//!
//! Architecture:
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Controller  │────►│  Event Bus   │────►│   Reducer    │
//! │  + Ticker    │     │  (ordered)   │     │  (pure fn)   │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!        ▲                                         │
//!        │                                         ▼
//!        │             ┌──────────────┐     ┌──────────────┐
//!        └─────────────│   Commands   │◄────│   Stepper    │
//!         arm/disarm   │ alert/risk/… │     │ (run state)  │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! The [`stepper`] holds the degradation arithmetic. The [`reducer`] wraps it
//! with control handling and turns state changes into [`events::Command`]s
//! that the scheduler executes.

pub mod bus;
pub mod events;
pub mod reducer;
pub mod state;
pub mod stepper;
