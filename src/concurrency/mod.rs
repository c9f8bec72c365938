//! Concurrency controls: global thread-count, task groups, and a memory
//! pool — the crosscutting utilities of spec.md §2/§5.

pub mod mem_pool;
pub mod pool;
pub mod task_group;

pub use mem_pool::MemoryPool;
pub use pool::{global_pool, install, try_set_num_threads};
pub use task_group::{for_each, invoke, with_task_group, TaskGroup};
