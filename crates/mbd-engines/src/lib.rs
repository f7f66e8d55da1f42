//! Engine contracts and backends for mbdsim.
//!
//! The numerical engines (model database, dynamics solver, FE reducer,
//! visualization exporter) are external collaborators reached through the
//! narrow trait contracts in this crate. Each engine is an explicit handle
//! object collected in an [`EngineSet`] and passed by reference everywhere,
//! so multiple orchestrators in one process stay independent and every
//! engine can be substituted in tests.
//!
//! The one backend built in here is [`scripted`]: replay engines driven by
//! a serde-defined scenario, used by the integration tests and the CLI.
//! Native shared-object backends implement the same traits out of tree.

pub mod config;
pub mod error;
pub mod scripted;
pub mod traits;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use traits::{
    DynamicsSolver, EngineSet, ExportSession, FeReducer, ModelDatabase, ObjectClass, RestartData,
    VisExporter,
};
