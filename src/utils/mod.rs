//! Small ambient utilities: batch-result counting and the external
//! file-system collaborator contract.
pub mod counter;
pub mod files;
