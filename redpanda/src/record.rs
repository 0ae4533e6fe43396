//! Conversion between Kafka messages and [`EventRecord`]s.

use order_stream_core::event::EventRecord;
use order_stream_core::event_bus::EventBusError;
use rdkafka::message::Message;
use rdkafka::producer::FutureRecord;

/// Build the outgoing Kafka record for `record` on `topic`.
pub(crate) fn to_kafka<'a>(topic: &'a str, record: &'a EventRecord) -> FutureRecord<'a, str, [u8]> {
    let mut out = FutureRecord::to(topic).payload(record.payload.as_slice());
    if let Some(key) = &record.key {
        out = out.key(key.as_str());
    }
    if let Some(timestamp) = record.timestamp {
        out = out.timestamp(timestamp);
    }
    out
}

/// Read a received message as an [`EventRecord`].
///
/// Keys are decoded as lossy UTF-8. A message without a payload (a tombstone)
/// is [`EventBusError::InvalidMessage`].
pub(crate) fn from_kafka<M: Message>(message: &M) -> Result<EventRecord, EventBusError> {
    let Some(payload) = message.payload() else {
        return Err(EventBusError::InvalidMessage(format!(
            "empty payload at {}[{}]@{}",
            message.topic(),
            message.partition(),
            message.offset()
        )));
    };

    Ok(EventRecord::new(
        message.key().map(|k| String::from_utf8_lossy(k).into_owned()),
        payload.to_vec(),
        message.timestamp().to_millis(),
    ))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use rdkafka::Timestamp;
    use rdkafka::message::OwnedMessage;

    fn received(payload: Option<&[u8]>, key: Option<&[u8]>, timestamp: Timestamp) -> OwnedMessage {
        OwnedMessage::new(
            payload.map(<[u8]>::to_vec),
            key.map(<[u8]>::to_vec),
            "order-stats".to_string(),
            timestamp,
            0,
            42,
            None,
        )
    }

    #[test]
    fn stats_message_becomes_record() {
        let record = from_kafka(&received(
            Some(br#"{"totalOrders":1}"#),
            Some(b"global"),
            Timestamp::CreateTime(1_735_689_600_000),
        ))
        .unwrap();

        assert_eq!(record.key.as_deref(), Some("global"));
        assert_eq!(record.payload, br#"{"totalOrders":1}"#.to_vec());
        assert_eq!(record.timestamp, Some(1_735_689_600_000));
    }

    #[test]
    fn key_and_timestamp_are_optional() {
        let record = from_kafka(&received(Some(b"{}"), None, Timestamp::NotAvailable)).unwrap();
        assert_eq!(record.key, None);
        assert_eq!(record.timestamp, None);
    }

    #[test]
    fn tombstone_is_rejected() {
        let err = from_kafka(&received(None, Some(b"global"), Timestamp::NotAvailable)).unwrap_err();
        assert!(err.to_string().contains("order-stats[0]@42"), "{err}");
    }

    #[test]
    fn outgoing_record_keeps_key_and_timestamp() {
        let record = EventRecord::new(Some("order-1".to_string()), b"{}".to_vec(), Some(7));
        let out = to_kafka("orders", &record);

        assert_eq!(out.topic, "orders");
        assert_eq!(out.key, Some("order-1"));
        assert_eq!(out.payload, Some(&b"{}"[..]));
        assert_eq!(out.timestamp, Some(7));
    }
}
