pub mod blend;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod features;
pub mod h2h;
pub mod markets;
pub mod numeric;
pub mod payload;
pub mod power;
pub mod score_matrix;
pub mod synthetic;
pub mod value;

pub use config::{EngineConfig, engine_config};
pub use engine::{
    AnalysisResult, FixtureAnalysis, FixtureDataSource, analyze_fixture, analyze_slate,
    gather_fixture_input,
};
pub use payload::FixtureInput;
