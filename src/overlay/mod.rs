// On-screen notifications: popup queue, persistent registries and badge loading.

pub mod badge;
pub mod registry;
pub mod scheduler;
pub mod surface;
