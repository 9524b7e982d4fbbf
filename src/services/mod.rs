pub mod api_client;
pub mod avatar_cache;
pub mod connection;
pub mod notice_board;
pub mod recorder;
pub mod session_manager;
