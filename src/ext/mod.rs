//! Small IO extensions shared by the container and script parsers.
pub mod io;
