use mqttrs::{
    Connack, Connect, ConnectReturnCode, Packet, Pid, Protocol, Publish, QosPid, Subscribe,
    SubscribeTopic, decode_slice, encode_slice,
};

use crate::error::RelayError;

/// Upper bound for a single inbound frame.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

pub fn build_connect_packet(client_id: &str, keep_alive: u16) -> Result<Vec<u8>, RelayError> {
    let packet: Packet = Connect {
        protocol: Protocol::MQTT311,
        keep_alive,
        client_id,
        clean_session: true,
        last_will: None,
        username: None,
        password: None,
    }
    .into();

    encode(&packet, client_id.len() + 16)
}

pub fn parse_connack(buf: &[u8]) -> Result<(), RelayError> {
    match decode_slice(buf)? {
        Some(Packet::Connack(Connack { code, .. })) if code == ConnectReturnCode::Accepted => {
            Ok(())
        }
        Some(Packet::Connack(Connack { code, .. })) => Err(RelayError::Protocol(format!(
            "connection refused by broker: {code:?}"
        ))),
        _ => Err(RelayError::Protocol(format!(
            "expected CONNACK, got {buf:x?}"
        ))),
    }
}

pub fn build_subscribe_packet(topic: &str) -> Result<Vec<u8>, RelayError> {
    let subscribe_topic = SubscribeTopic {
        topic_path: String::from(topic),
        qos: mqttrs::QoS::AtMostOnce,
    };
    let topics = vec![subscribe_topic];
    let packet: Packet = Subscribe {
        pid: Pid::default(),
        topics,
    }
    .into();
    encode(&packet, topic.len() + 16)
}

pub fn build_publish_packet(topic: &str, payload: &[u8]) -> Result<Vec<u8>, RelayError> {
    let packet: Packet = Publish {
        dup: false,
        qospid: QosPid::AtMostOnce,
        retain: false,
        topic_name: topic,
        payload,
    }
    .into();
    encode(&packet, topic.len() + payload.len() + 16)
}

pub fn build_pingreq_packet() -> Result<Vec<u8>, RelayError> {
    encode(&Packet::Pingreq, 2)
}

pub fn build_disconnect_packet() -> Result<Vec<u8>, RelayError> {
    encode(&Packet::Disconnect, 2)
}

fn encode(packet: &Packet, capacity: usize) -> Result<Vec<u8>, RelayError> {
    let mut buf = vec![0u8; capacity];
    let packet_length = encode_slice(packet, &mut buf)?;
    buf.truncate(packet_length);
    Ok(buf)
}

pub fn is_mqtt_packet(first_byte: u8) -> bool {
    let packet_type = first_byte >> 4;
    (1..=14).contains(&packet_type)
}

/// Total length of the frame at the start of `buf`, or `None` while the
/// remaining-length prefix is still incomplete.
pub fn frame_len(buf: &[u8]) -> Result<Option<usize>, RelayError> {
    let mut remaining = 0usize;
    for (i, byte) in buf.iter().skip(1).take(4).enumerate() {
        remaining |= usize::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some(1 + (i + 1) + remaining));
        }
    }
    if buf.len() >= 5 {
        return Err(RelayError::Protocol(
            "remaining length longer than four bytes".to_string(),
        ));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_packet_carries_client_id() {
        let packet = build_connect_packet("sensor-relay", 120).unwrap();
        match decode_slice(&packet).unwrap() {
            Some(Packet::Connect(connect)) => {
                assert_eq!(connect.client_id, "sensor-relay");
                assert_eq!(connect.keep_alive, 120);
                assert!(connect.clean_session);
            }
            other => panic!("unexpected packet {other:?}"),
        }
        assert_eq!(frame_len(&packet).unwrap(), Some(packet.len()));
    }

    #[test]
    fn connack_codes() {
        assert!(parse_connack(&[0x20, 0x02, 0x00, 0x00]).is_ok());
        assert!(matches!(
            parse_connack(&[0x20, 0x02, 0x00, 0x05]),
            Err(RelayError::Protocol(ref m)) if m.contains("refused")
        ));
        assert!(matches!(
            parse_connack(&[0xd0, 0x00, 0x00, 0x00]),
            Err(RelayError::Protocol(_))
        ));
    }

    #[test]
    fn publish_packet_round_trips_payload() {
        let payload = vec![b'x'; 300];
        let packet = build_publish_packet("sensor/derived/abc", &payload).unwrap();
        assert_eq!(frame_len(&packet).unwrap(), Some(packet.len()));
        match decode_slice(&packet).unwrap() {
            Some(Packet::Publish(publish)) => {
                assert_eq!(publish.topic_name, "sensor/derived/abc");
                assert_eq!(publish.payload, payload.as_slice());
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[test]
    fn control_packets_are_two_bytes() {
        assert_eq!(build_pingreq_packet().unwrap(), vec![0xc0, 0x00]);
        assert_eq!(build_disconnect_packet().unwrap(), vec![0xe0, 0x00]);
    }

    #[test]
    fn frame_len_waits_for_length_prefix() {
        assert_eq!(frame_len(&[]).unwrap(), None);
        assert_eq!(frame_len(&[0x30]).unwrap(), None);
        assert_eq!(frame_len(&[0x30, 0x80]).unwrap(), None);
        assert_eq!(frame_len(&[0x30, 0x80, 0x01]).unwrap(), Some(3 + 128));
        assert_eq!(frame_len(&[0xd0, 0x00]).unwrap(), Some(2));
        assert!(frame_len(&[0x30, 0xff, 0xff, 0xff, 0xff, 0x01]).is_err());
    }

    #[test]
    fn packet_type_nibble() {
        assert!(is_mqtt_packet(0x30));
        assert!(is_mqtt_packet(0xe0));
        assert!(!is_mqtt_packet(0x00));
        assert!(!is_mqtt_packet(0xf0));
    }
}
