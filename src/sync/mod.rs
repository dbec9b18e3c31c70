/*!
 * Synchronization
 *
 * Counting semaphores (the sole blocking/wakeup mechanism) and the per-process
 * gates the dispatcher uses to hand out turns.
 */

mod semaphore;
mod table;

pub use semaphore::{Acquire, GateClosed, SemState, Semaphore, SemaphoreKind};
pub use table::SemaphoreTable;
