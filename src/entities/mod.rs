//! Label records, catalogs, and the question-answering workflow used by the CLI.

pub(crate) mod answer;
pub(crate) mod catalog;
pub(crate) mod consult;
pub(crate) mod label;
pub(crate) mod locate;
