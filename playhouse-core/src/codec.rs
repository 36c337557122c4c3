use crate::error::{ConnectorError, ConnectorResult, ErrorCode};
use crate::packet::{Packet, MAX_MSG_ID_LEN, MAX_PAYLOAD_LEN};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Bytes consumed by every field ahead of `MsgId` in either frame shape,
/// not counting the `ContentSize` prefix itself.
const MSG_ID_LEN_FIELD: usize = 1;
const MSG_SEQ_FIELD: usize = 2;
const STAGE_ID_FIELD: usize = 8;
const ERROR_CODE_FIELD: usize = 2;
const ORIGINAL_SIZE_FIELD: usize = 4;
const CONTENT_SIZE_PREFIX: usize = 4;

/// Minimum complete response frame: the prefix plus every fixed-width
/// field with a zero-length MsgId and payload.
const MIN_RESPONSE_FRAME: usize = CONTENT_SIZE_PREFIX
    + MSG_ID_LEN_FIELD
    + MSG_SEQ_FIELD
    + STAGE_ID_FIELD
    + ERROR_CODE_FIELD
    + ORIGINAL_SIZE_FIELD;

/// Encodes an outbound request frame: `ContentSize(4) | MsgIdLen(1) |
/// MsgId | MsgSeq(2) | StageId(8) | Payload`. Requests never carry
/// `ErrorCode`/`OriginalSize` — encoding those would desynchronize every
/// peer that only speaks the request shape.
///
/// `MsgIdLen` is a single byte, so `msg_id` longer than 255 bytes is
/// rejected outright rather than silently truncated on the wire.
pub fn encode_request(packet: &Packet) -> ConnectorResult<Vec<u8>> {
    let msg_id = packet.msg_id.as_bytes();

    if msg_id.is_empty() || msg_id.len() > MAX_MSG_ID_LEN {
        return Err(ConnectorError::Fatal(ErrorCode::ProtocolViolation));
    }
    if packet.payload.len() > MAX_PAYLOAD_LEN {
        return Err(ConnectorError::Fatal(ErrorCode::ProtocolViolation));
    }

    let content_size =
        MSG_ID_LEN_FIELD + msg_id.len() + MSG_SEQ_FIELD + STAGE_ID_FIELD + packet.payload.len();

    let mut buffer = Vec::with_capacity(CONTENT_SIZE_PREFIX + content_size);
    buffer.write_u32::<LittleEndian>(content_size as u32)?;
    buffer.write_u8(msg_id.len() as u8)?;
    buffer.extend_from_slice(msg_id);
    buffer.write_u16::<LittleEndian>(packet.msg_seq)?;
    buffer.write_i64::<LittleEndian>(packet.stage_id)?;
    buffer.extend_from_slice(&packet.payload);

    Ok(buffer)
}

/// Decodes a complete inbound response frame (the `ContentSize` prefix
/// included). `frame` must be exactly `4 + ContentSize` bytes, as
/// extracted by the receive-side frame scanner.
pub fn decode_response(frame: &[u8]) -> ConnectorResult<Packet> {
    if frame.len() < MIN_RESPONSE_FRAME {
        return Err(ConnectorError::Fatal(ErrorCode::InvalidResponse));
    }

    let mut cursor = Cursor::new(frame);
    let content_size = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| ConnectorError::Fatal(ErrorCode::InvalidResponse))?;

    if content_size as usize > MAX_PAYLOAD_LEN {
        return Err(ConnectorError::Fatal(ErrorCode::InvalidResponse));
    }
    if CONTENT_SIZE_PREFIX + content_size as usize != frame.len() {
        return Err(ConnectorError::Fatal(ErrorCode::InvalidResponse));
    }

    let msg_id_len = cursor
        .read_u8()
        .map_err(|_| ConnectorError::Fatal(ErrorCode::InvalidResponse))? as usize;

    if msg_id_len == 0 || msg_id_len > MAX_MSG_ID_LEN {
        return Err(ConnectorError::Fatal(ErrorCode::InvalidResponse));
    }

    let header_so_far = cursor.position() as usize;
    if header_so_far + msg_id_len > frame.len() {
        return Err(ConnectorError::Fatal(ErrorCode::InvalidResponse));
    }

    let msg_id_bytes = &frame[header_so_far..header_so_far + msg_id_len];
    let msg_id = std::str::from_utf8(msg_id_bytes)
        .map_err(|_| ConnectorError::Fatal(ErrorCode::InvalidResponse))?
        .to_string();
    cursor.set_position((header_so_far + msg_id_len) as u64);

    let msg_seq = cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| ConnectorError::Fatal(ErrorCode::InvalidResponse))?;
    let stage_id = cursor
        .read_i64::<LittleEndian>()
        .map_err(|_| ConnectorError::Fatal(ErrorCode::InvalidResponse))?;
    let error_code = cursor
        .read_i16::<LittleEndian>()
        .map_err(|_| ConnectorError::Fatal(ErrorCode::InvalidResponse))?;
    let original_size = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| ConnectorError::Fatal(ErrorCode::InvalidResponse))?;

    let payload_start = cursor.position() as usize;
    let payload = frame[payload_start..].to_vec();

    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ConnectorError::Fatal(ErrorCode::InvalidResponse));
    }

    Ok(Packet {
        msg_id,
        msg_seq,
        stage_id,
        error_code,
        original_size,
        payload,
    })
}
