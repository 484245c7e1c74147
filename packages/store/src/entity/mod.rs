pub mod notification_log;
