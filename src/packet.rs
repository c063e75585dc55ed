//! Byte layout of bus packets.
//!
//! Framing, CRC and retransmission belong to the bus driver; the interlocking
//! only needs to know where the header fields sit. Packets built here carry a
//! zero CRC for the driver to fill in, and received packets are expected to
//! have had their CRC checked before they reach the control point.

/// Destination address.
pub const DEST: usize = 0;
/// Source address.
pub const SRC: usize = 1;
/// Total packet length, header included.
pub const LEN: usize = 2;
/// CRC low byte.
pub const CRC_L: usize = 3;
/// CRC high byte.
pub const CRC_H: usize = 4;
/// Packet type.
pub const TYPE: usize = 5;
/// First data byte.
pub const DATA: usize = 6;

/// Broadcast destination address.
pub const BROADCAST: u8 = 0xFF;

/// Packet type of a CTC command.
pub const TYPE_COMMAND: u8 = b'C';
/// Packet type of a status report.
pub const TYPE_STATUS: u8 = b'S';
/// Ping request.
pub const TYPE_PING: u8 = b'A';
/// Ping reply.
pub const TYPE_PING_REPLY: u8 = b'a';
/// Version request.
pub const TYPE_VERSION: u8 = b'V';
/// Version reply.
pub const TYPE_VERSION_REPLY: u8 = b'v';
/// Reset request.
pub const TYPE_RESET: u8 = b'X';
/// Non-volatile storage read. Not served here.
pub const TYPE_STORAGE_READ: u8 = b'R';
/// Non-volatile storage write. Not served here.
pub const TYPE_STORAGE_WRITE: u8 = b'W';

/// Bus version byte for a wired node.
pub const VERSION_WIRED: u8 = 0x00;

/// Data bytes of the version reply: bus version, three software revision
/// bytes, hardware major and minor, then the four-character device name.
pub const VERSION_DATA: [u8; 10] = [VERSION_WIRED, 0, 0, 0, 0, 0, b'C', b'P', b'3', b' '];

/// Largest packet the bus carries.
pub const MAX_LEN: usize = 20;

/// One bus packet, header included.
pub type Packet = heapless::Vec<u8, MAX_LEN>;

/// Build a packet of type `msg_type` carrying `data` from `src` to `dest`.
///
/// Data past [`MAX_LEN`] is cut off. The CRC bytes are left zero; the bus
/// driver must fill them in before transmitting.
///
/// ```
/// use cp_interlock::packet;
///
/// let pkt = packet::build(0x03, 0x10, packet::TYPE_PING_REPLY, &[]);
/// assert_eq!(&pkt[..], &[0x10, 0x03, 6, 0, 0, b'a']);
/// ```
pub fn build(src: u8, dest: u8, msg_type: u8, data: &[u8]) -> Packet {
    let data = &data[..data.len().min(MAX_LEN - DATA)];
    let mut pkt = Packet::new();
    // Both slices fit: the header is DATA bytes and data was cut to the rest.
    let _ = pkt.extend_from_slice(&[dest, src, (DATA + data.len()) as u8, 0, 0, msg_type]);
    let _ = pkt.extend_from_slice(data);
    pkt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fills_header() {
        let pkt = build(0x03, 0x10, TYPE_VERSION_REPLY, &VERSION_DATA);
        assert_eq!(pkt.len(), 16);
        assert_eq!(pkt[DEST], 0x10);
        assert_eq!(pkt[SRC], 0x03);
        assert_eq!(pkt[LEN], 16);
        assert_eq!(pkt[TYPE], b'v');
        assert_eq!((pkt[CRC_L], pkt[CRC_H]), (0, 0));
        assert_eq!(&pkt[12..16], b"CP3 ");
    }

    #[test]
    fn build_truncates_data() {
        let pkt = build(0x03, BROADCAST, TYPE_STATUS, &[0xAA; 32]);
        assert_eq!(pkt.len(), MAX_LEN);
        assert_eq!(pkt[LEN] as usize, MAX_LEN);
    }
}
