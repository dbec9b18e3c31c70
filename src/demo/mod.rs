/*!
 * Demo Applications
 * Programs built on the public kernel API
 */

pub mod copy;

pub use copy::{copy_file, CopyReport};
