use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while setting up a calculation. Numerical non-convergence is
/// not an error; it is reported through [`crate::hf::ConvergenceRecord`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("could not read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid input file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown element '{0}'")]
    UnknownElement(String),
    #[error("invalid term '{term}' in configuration '{config}'")]
    InvalidTerm { term: String, config: String },
    #[error("unknown method '{0}', expected one of HartreeFock, ApproxHF, Hartree, KohnSham, Local")]
    UnknownMethod(String),
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
}

pub type Result<T> = std::result::Result<T, Error>;
