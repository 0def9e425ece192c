pub mod notification_loop;
pub mod sync_loop;
pub mod task_runner;
