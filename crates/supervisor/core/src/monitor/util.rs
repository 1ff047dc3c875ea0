use alloy_primitives::{B256, Bytes, Log, keccak256};

/// Converts a log into its raw message payload.
///
/// The payload is the concatenation of all log topics followed by the log data.
pub fn log_to_message_payload(log: &Log) -> Bytes {
    let mut payload = Vec::with_capacity(log.topics().len() * 32 + log.data.data.len());

    for topic in log.topics() {
        payload.extend_from_slice(topic.as_slice());
    }
    payload.extend_from_slice(&log.data.data);

    payload.into()
}

/// Hashes the message payload of a log. This is the hash callers claim in `checkMessage`.
pub fn log_to_payload_hash(log: &Log) -> B256 {
    keccak256(log_to_message_payload(log))
}

/// Converts the raw logs of one block into the entries stored in the log database.
pub fn logs_to_entries(logs: &[Log]) -> Vec<supervisor_types::Log> {
    logs.iter()
        .enumerate()
        .map(|(index, log)| {
            supervisor_types::Log::new(index as u32, log.address, log_to_payload_hash(log))
        })
        .collect()
}
