use crucible::core::forcefield::registry::ForcefieldLoadError;
use crucible::core::forcefield::writer::WriteError;
use crucible::core::io::structure::StructureLoadError;
use crucible::engine::error::EngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    ForcefieldLoad(#[from] ForcefieldLoadError),

    #[error(transparent)]
    StructureLoad(#[from] StructureLoadError),

    #[error(transparent)]
    RuleWrite(#[from] WriteError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
