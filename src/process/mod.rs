/*!
 * Process Module
 * Process descriptors and the handle tables that index them
 */

pub mod pcb;
pub mod table;
pub mod types;

pub use pcb::Process;
pub use table::ProcessTable;
pub use types::{ExitStatus, ProcessFailure, ProcessInfo, ProcessResult};
