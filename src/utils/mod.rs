pub mod async_task;
pub mod compress;
pub mod path;

#[cfg(test)]
mod utils_test;
