//! Course-group change request engine.
//!
//! A student asks to move from one group of a course to another. The engine
//! decides whether the move is structurally legal, routes it to the
//! academic program that owns the decision, and drives the request through
//! its PENDING → APPROVED/REJECTED lifecycle.
//!
//! # Modules
//!
//! - **`models`**: Domain types: typed ids, `WeeklySlot`, `CourseGroup`,
//!   `Enrollment`, `ChangeRequest`, `AcademicTerm`, `ChangeWindow`
//! - **`schedule`**: Weekly meeting overlap and conflict detection
//! - **`validation`**: `Validator` trait and the five structural checks
//! - **`routing`**: Program routing table
//! - **`risk`**: Traffic-light academic risk bands
//! - **`store`**: Persistence collaborator and an in-memory implementation
//! - **`audit`**: Lifecycle audit sinks
//! - **`service`**: `ChangeRequestService`, the exposed operations
//! - **`config`**, **`clock`**, **`error`**: Ambient support
//!
//! # Architecture
//!
//! Validation, routing, conflict detection and risk classification are
//! pure functions of their inputs. Only `service` talks to the store, so
//! the core can be tested without any persistence.

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod risk;
pub mod routing;
pub mod schedule;
pub mod service;
pub mod store;
pub mod validation;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use service::ChangeRequestService;
