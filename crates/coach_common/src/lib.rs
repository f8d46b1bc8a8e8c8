//! Coach Common - shared types for the skill-progress coaching client.
//!
//! Wire protocol, distribution math, configuration and the session error
//! taxonomy. No terminal or network I/O lives here.

pub mod config;
pub mod distribution;
pub mod error;
pub mod protocol;
pub mod types;

pub use distribution::{Distribution, DistributionError, Family};
pub use error::SessionError;
pub use protocol::ProtocolError;
pub use types::{PlotSeries, SessionReport, SurveyResponse, VariableStats};
