use base64::{engine::general_purpose::STANDARD, Engine};
use persist_core::{ChatMessage, MessageBody, PersistError, Result};
use persist_store::messages::RawChatMessage;

/// Decode a raw, base64-encoded message payload into its tagged [`MessageBody`].
///
/// The wire protocol clients actually speak (thrift binary) is out of scope
/// here; what lands in `chat_message.body` is the base64 of the JSON encoding
/// of [`MessageBody`] itself, which is all the interpreter needs.
pub fn decode_message(raw: RawChatMessage) -> Result<ChatMessage> {
    let bytes = STANDARD
        .decode(raw.payload_base64.as_bytes())
        .map_err(|e| PersistError::Decode(e.to_string()))?;
    let body: MessageBody =
        serde_json::from_slice(&bytes).map_err(|e| PersistError::Decode(e.to_string()))?;
    Ok(ChatMessage {
        id: raw.id,
        chat_session_id: raw.chat_session_id,
        timestamp: raw.timestamp,
        body,
    })
}

/// Encode a [`MessageBody`] the same way a producer would, for tests and
/// ingestion helpers.
pub fn encode_message(body: &MessageBody) -> String {
    let json = serde_json::to_vec(body).expect("MessageBody always serializes");
    STANDARD.encode(json)
}
