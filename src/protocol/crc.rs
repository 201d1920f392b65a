//! CRC-16/MCRF4XX checksum and the CRC-Extra seed table
//!
//! MAVLink folds a per-message "extra" byte into the checksum so that two
//! peers with different message definitions reject each other's frames.

use ::crc::{CRC_16_MCRF4XX, Crc};

use super::messages::id;

/// CRC-16/MCRF4XX (poly 0x1021 reflected, init 0xFFFF, no final xor)
const MCRF4XX: Crc<u16> = Crc::<u16>::new(&CRC_16_MCRF4XX);

/// Checksum of empty input.
pub const CRC_INIT: u16 = 0xFFFF;

/// CRC-Extra seeds for every message the link consumes or produces.
pub const CRC_EXTRA: &[(u32, u8)] = &[
    (id::HEARTBEAT, 50),
    (id::SYS_STATUS, 124),
    (id::PARAM_REQUEST_LIST, 159),
    (id::PARAM_VALUE, 220),
    (id::PARAM_SET, 168),
    (id::ATTITUDE, 39),
    (id::GLOBAL_POSITION_INT, 104),
    (id::MISSION_REQUEST, 230),
    (id::MISSION_COUNT, 221),
    (id::MISSION_CLEAR_ALL, 232),
    (id::MISSION_ACK, 153),
    (id::MISSION_REQUEST_INT, 196),
    (id::MISSION_ITEM_INT, 38),
    (id::VFR_HUD, 20),
    (id::COMMAND_LONG, 152),
    (id::COMMAND_ACK, 143),
    (id::STATUSTEXT, 83),
];

/// Look up the CRC-Extra seed for a message id.
pub fn crc_extra(msg_id: u32) -> Option<u8> {
    CRC_EXTRA.iter().find(|(id, _)| *id == msg_id).map(|(_, seed)| *seed)
}

/// CRC-16/MCRF4XX over a byte slice.
pub fn crc16_mcrf4xx(data: &[u8]) -> u16 {
    MCRF4XX.checksum(data)
}

/// Frame checksum: CRC over everything after the magic byte, then the seed.
pub fn frame_checksum(header_and_payload: &[u8], seed: u8) -> u16 {
    let mut digest = MCRF4XX.digest();
    digest.update(header_and_payload);
    digest.update(&[seed]);
    digest.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value_matches_catalogue() {
        // CRC-16/MCRF4XX catalogue check value
        assert_eq!(crc16_mcrf4xx(b"123456789"), 0x6F91);
    }

    #[test]
    fn empty_input_is_init() {
        assert_eq!(crc16_mcrf4xx(&[]), CRC_INIT);
    }

    #[test]
    fn seed_table_has_no_duplicates() {
        for (i, (a, _)) in CRC_EXTRA.iter().enumerate() {
            assert!(CRC_EXTRA.iter().skip(i + 1).all(|(b, _)| a != b), "duplicate id {}", a);
        }
    }

    #[test]
    fn seeds_match_common_dialect() {
        assert_eq!(crc_extra(id::HEARTBEAT), Some(50));
        assert_eq!(crc_extra(id::COMMAND_LONG), Some(152));
        assert_eq!(crc_extra(id::MISSION_ITEM_INT), Some(38));
        assert_eq!(crc_extra(id::MISSION_COUNT), Some(221));
        assert_eq!(crc_extra(id::PARAM_SET), Some(168));
        assert_eq!(crc_extra(9999), None);
    }

    #[test]
    fn golden_heartbeat_frame() {
        // GCS heartbeat, seq 0, sys 255, comp 190:
        // custom_mode=0, type=GCS(6), autopilot=INVALID(8), base_mode=0, status=ACTIVE(4), version=3
        let frame: [u8; 21] = [
            0xFD, 0x09, 0x00, 0x00, 0x00, 0xFF, 0xBE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x06, 0x08, 0x00, 0x04, 0x03, 0x3D, 0x48,
        ];
        let checksum = frame_checksum(&frame[1..19], 50);
        assert_eq!(checksum, 0x483D);
        assert_eq!(checksum.to_le_bytes(), [frame[19], frame[20]]);
    }

    #[test]
    fn seed_is_folded_after_the_data() {
        let data = [0x09, 0x00, 0x00, 0x00, 0xFF, 0xBE];
        let mut with_seed = data.to_vec();
        with_seed.push(50);
        assert_eq!(frame_checksum(&data, 50), crc16_mcrf4xx(&with_seed));
    }

    #[test]
    fn checksum_is_order_sensitive() {
        assert_ne!(crc16_mcrf4xx(&[1, 2]), crc16_mcrf4xx(&[2, 1]));
    }
}
