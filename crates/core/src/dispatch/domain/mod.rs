pub mod dispatcher;
pub mod recognition_client;
