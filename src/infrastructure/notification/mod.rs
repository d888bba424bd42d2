//! Notification infrastructure: channel sink, dispatcher task, storage and reads

mod dispatcher;
mod repository;
mod service;
mod sink;

pub use dispatcher::NotificationDispatcher;
pub use repository::StorageNotificationRepository;
pub use service::NotificationService;
pub use sink::ChannelNotificationSink;
