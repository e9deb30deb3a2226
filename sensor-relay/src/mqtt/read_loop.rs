use mqttrs::{Packet, decode_slice};
use tracing::debug;

use crate::SensorMessage;
use crate::error::RelayError;
use crate::transform::{PayloadTransform, TransformError};

use super::packets::is_mqtt_packet;
use super::topic::output_topic;

#[derive(Debug)]
pub enum ReadLoopResult {
    /// A derived message and the topic it should be published on.
    Forward { topic: String, payload: Vec<u8> },
    /// The payload could not be transformed; nothing is forwarded.
    Rejected { topic: String, error: TransformError },
    Skipped,
    Unknown,
}

pub fn handle_packet(
    transform: &impl PayloadTransform,
    output_template: &str,
    packet: &[u8],
) -> Result<ReadLoopResult, RelayError> {
    match packet.first() {
        Some(first) if is_mqtt_packet(*first) => {}
        _ => return Ok(ReadLoopResult::Unknown),
    }

    match decode_slice(packet)? {
        Some(Packet::Publish(publish)) => {
            let source = publish.topic_name.to_string();
            let derived = SensorMessage::from_slice(publish.payload)
                .and_then(|message| {
                    debug!(topic = %source, "Got update: {message}");
                    transform.apply(&message)
                });
            match derived {
                Ok(derived) => {
                    let topic = output_topic(output_template, &source);
                    let payload = derived.to_vec()?;
                    debug!(%topic, "Derived: {derived}");
                    Ok(ReadLoopResult::Forward { topic, payload })
                }
                Err(error) => Ok(ReadLoopResult::Rejected {
                    topic: source,
                    error,
                }),
            }
        }
        Some(other) => {
            debug!("Ignoring {other:?}");
            Ok(ReadLoopResult::Skipped)
        }
        None => Ok(ReadLoopResult::Skipped),
    }
}
