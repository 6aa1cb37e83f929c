pub mod telegram;

/// A message received from a source feed
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Chat id of the source channel or group
    pub source: i64,
    /// Message text, or the caption for media posts
    pub text: String,
}
