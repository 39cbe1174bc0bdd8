pub mod frame;
pub mod hub;
pub mod service;

pub use frame::{Frame, MESSAGE_KIND};
pub use hub::{ConnectionId, Hub, Outbound};
pub use service::ChatService;
