// Engine events and user notices, marshalled onto the serialized UI context.

pub mod events;
pub mod notice;
pub mod ui;
