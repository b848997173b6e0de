//! Connection setup: handshake parsing and the setup response
//!
//! After accepting a connection the server reads a 12-byte handshake
//! header (first byte selects endian), then the authorization name and
//! data blocks, each padded to 4 bytes. The reply is either a Failed
//! record with a reason or the full setup response: vendor, pixmap
//! formats and screens, from which clients take their resource ID
//! (base, mask) pair.

use super::types::*;
use super::wire::{ByteOrderReader, ByteOrderWriter, ShortRead, pad};
use crate::config::ServerConfig;

pub const RELEASE_NUMBER: u32 = 1_0000;
pub const MAXIMUM_REQUEST_LENGTH: u16 = u16::MAX;

/// Visual classes from the core protocol.
pub mod visual_class {
    pub const STATIC_GRAY: u8 = 0;
    pub const GRAY_SCALE: u8 = 1;
    pub const STATIC_COLOR: u8 = 2;
    pub const PSEUDO_COLOR: u8 = 3;
    pub const TRUE_COLOR: u8 = 4;
    pub const DIRECT_COLOR: u8 = 5;

    /// Whether colormap entries of this class can be stored by clients.
    pub fn is_writable(class: u8) -> bool {
        matches!(class, GRAY_SCALE | PSEUDO_COLOR | DIRECT_COLOR)
    }
}

/// The parsed client half of the handshake.
#[derive(Debug, Clone)]
pub struct SetupRequest {
    pub byte_order: ByteOrder,
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub auth_protocol_name: String,
    pub auth_protocol_data: Vec<u8>,
}

impl SetupRequest {
    /// Header length; the auth blocks follow.
    pub const HEADER_LEN: usize = 12;

    /// Parse the fixed 12-byte header. Returns the byte order, the
    /// protocol version and the unpadded auth block lengths; each block
    /// on the wire is followed by pad to 4 bytes.
    pub fn parse_header(
        header: &[u8; 12],
    ) -> Result<(ByteOrder, u16, u16, usize, usize), ShortRead> {
        let order = ByteOrder::from_initial_byte(header[0]).unwrap_or(ByteOrder::LittleEndian);
        let mut r = ByteOrderReader::new(&header[2..], order);
        let major = r.read_u16()?;
        let minor = r.read_u16()?;
        let name_len = r.read_u16()? as usize;
        let data_len = r.read_u16()? as usize;
        Ok((order, major, minor, name_len, data_len))
    }

    /// Assemble the full request once the auth blocks are in.
    pub fn from_parts(
        byte_order: ByteOrder,
        major: u16,
        minor: u16,
        name_len: usize,
        data_len: usize,
        auth: &[u8],
    ) -> Result<Self, ShortRead> {
        let mut r = ByteOrderReader::new(auth, byte_order);
        let name = r.read_padded_bytes(name_len)?.to_vec();
        let data = r.read_padded_bytes(data_len)?.to_vec();
        Ok(Self {
            byte_order,
            protocol_major_version: major,
            protocol_minor_version: minor,
            auth_protocol_name: String::from_utf8_lossy(&name).into_owned(),
            auth_protocol_data: data,
        })
    }
}

/// A single advertised visual.
#[derive(Debug, Clone, Copy)]
pub struct Visual {
    pub id: VisualId,
    pub class: u8,
    pub depth: u8,
    pub bits_per_rgb: u8,
    pub colormap_entries: u16,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
}

impl Visual {
    pub fn is_writable(&self) -> bool {
        visual_class::is_writable(self.class)
    }
}

/// Everything the setup response advertises, cached by the server for
/// the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Setup {
    pub vendor: String,
    pub width: u16,
    pub height: u16,
    pub width_mm: u16,
    pub height_mm: u16,
    pub root_visual: VisualId,
    pub root_depth: u8,
    pub black_pixel: u32,
    pub white_pixel: u32,
    pub visuals: Vec<Visual>,
}

impl Setup {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            vendor: config.vendor.clone(),
            width: config.screen.width,
            height: config.screen.height,
            width_mm: config.screen.width_mm,
            height_mm: config.screen.height_mm,
            root_visual: ROOT_VISUAL,
            root_depth: 24,
            black_pixel: 0x0000_0000,
            white_pixel: 0x00ff_ffff,
            visuals: vec![
                Visual {
                    id: ROOT_VISUAL,
                    class: visual_class::TRUE_COLOR,
                    depth: 24,
                    bits_per_rgb: 8,
                    colormap_entries: 256,
                    red_mask: 0x00ff_0000,
                    green_mask: 0x0000_ff00,
                    blue_mask: 0x0000_00ff,
                },
                Visual {
                    id: PSEUDOCOLOR_VISUAL,
                    class: visual_class::PSEUDO_COLOR,
                    depth: 8,
                    bits_per_rgb: 8,
                    colormap_entries: 256,
                    red_mask: 0,
                    green_mask: 0,
                    blue_mask: 0,
                },
            ],
        }
    }

    pub fn visual(&self, id: VisualId) -> Option<&Visual> {
        self.visuals.iter().find(|v| v.id == id)
    }

    /// Encode the Success setup response for one client.
    pub fn encode_success(
        &self,
        order: ByteOrder,
        resource_id_base: u32,
        resource_id_mask: u32,
    ) -> Vec<u8> {
        let mut w = ByteOrderWriter::new(order);
        w.write_u8(1); // Success
        w.write_u8(0);
        w.write_u16(PROTOCOL_MAJOR_VERSION);
        w.write_u16(PROTOCOL_MINOR_VERSION);
        let length_at = w.len();
        w.write_u16(0); // patched below

        let body_start = w.len();
        w.write_u32(RELEASE_NUMBER);
        w.write_u32(resource_id_base);
        w.write_u32(resource_id_mask);
        w.write_u32(MOTION_BUFFER_SIZE as u32);
        w.write_u16(self.vendor.len() as u16);
        w.write_u16(MAXIMUM_REQUEST_LENGTH);
        w.write_u8(1); // one screen
        let formats: &[(u8, u8)] = &[(24, 32), (8, 8)];
        w.write_u8(formats.len() as u8);
        w.write_u8(match order {
            ByteOrder::LittleEndian => 0,
            ByteOrder::BigEndian => 1,
        });
        w.write_u8(0); // bitmap bit order: LSB first
        w.write_u8(32); // bitmap scanline unit
        w.write_u8(32); // bitmap scanline pad
        w.write_u8(8); // min keycode
        w.write_u8(255); // max keycode
        w.write_padding(4);
        w.write_padded_bytes(self.vendor.as_bytes());

        for &(depth, bpp) in formats {
            w.write_u8(depth);
            w.write_u8(bpp);
            w.write_u8(32); // scanline pad
            w.write_padding(5);
        }

        self.encode_screen(&mut w);

        let body_len = w.len() - body_start;
        debug_assert_eq!(body_len % 4, 0);
        w.patch_u16(length_at, (body_len / 4) as u16);
        w.into_vec()
    }

    fn encode_screen(&self, w: &mut ByteOrderWriter) {
        w.write_u32(ROOT_WINDOW);
        w.write_u32(DEFAULT_COLORMAP);
        w.write_u32(self.white_pixel);
        w.write_u32(self.black_pixel);
        w.write_u32(0); // current input masks
        w.write_u16(self.width);
        w.write_u16(self.height);
        w.write_u16(self.width_mm);
        w.write_u16(self.height_mm);
        w.write_u16(1); // min installed maps
        w.write_u16(1); // max installed maps
        w.write_u32(self.root_visual);
        w.write_u8(0); // backing stores: Never
        w.write_u8(0); // save unders
        w.write_u8(self.root_depth);

        // One DEPTH block per distinct visual depth.
        let mut depths: Vec<u8> = self.visuals.iter().map(|v| v.depth).collect();
        depths.sort_unstable();
        depths.dedup();
        w.write_u8(depths.len() as u8);

        for depth in depths {
            let visuals: Vec<&Visual> =
                self.visuals.iter().filter(|v| v.depth == depth).collect();
            w.write_u8(depth);
            w.write_u8(0);
            w.write_u16(visuals.len() as u16);
            w.write_padding(4);
            for visual in visuals {
                w.write_u32(visual.id);
                w.write_u8(visual.class);
                w.write_u8(visual.bits_per_rgb);
                w.write_u16(visual.colormap_entries);
                w.write_u32(visual.red_mask);
                w.write_u32(visual.green_mask);
                w.write_u32(visual.blue_mask);
                w.write_padding(4);
            }
        }
    }

    /// Encode the Failed setup response with a reason string.
    pub fn encode_failed(order: ByteOrder, reason: &str) -> Vec<u8> {
        let mut w = ByteOrderWriter::new(order);
        w.write_u8(0); // Failed
        w.write_u8(reason.len() as u8);
        w.write_u16(PROTOCOL_MAJOR_VERSION);
        w.write_u16(PROTOCOL_MINOR_VERSION);
        w.write_u16(((reason.len() + pad(reason.len())) / 4) as u16);
        w.write_padded_bytes(reason.as_bytes());
        w.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(order: u8, name_len: u16, data_len: u16) -> [u8; 12] {
        let mut h = [0u8; 12];
        h[0] = order;
        h[2..4].copy_from_slice(&11u16.to_le_bytes());
        h[6..8].copy_from_slice(&name_len.to_le_bytes());
        h[8..10].copy_from_slice(&data_len.to_le_bytes());
        h
    }

    #[test]
    fn test_parse_header_no_auth() {
        let h = header(b'l', 0, 0);
        let (order, major, _minor, name, data) = SetupRequest::parse_header(&h).unwrap();
        assert_eq!(order, ByteOrder::LittleEndian);
        assert_eq!(name, 0);
        assert_eq!(data, 0);
        assert_eq!(major, 11);
    }

    #[test]
    fn test_parse_header_auth_lengths() {
        let h = header(b'l', 18, 16);
        let (_, _, _, name, data) = SetupRequest::parse_header(&h).unwrap();
        assert_eq!(name, 18);
        assert_eq!(data, 16);
    }

    #[test]
    fn test_setup_request_from_parts() {
        let mut auth = Vec::new();
        auth.extend_from_slice(b"MIT-MAGIC-COOKIE-1");
        auth.extend_from_slice(&[0, 0]); // pad to 20
        auth.extend_from_slice(&[0xab; 16]);
        let req =
            SetupRequest::from_parts(ByteOrder::LittleEndian, 11, 0, 18, 16, &auth).unwrap();
        assert_eq!(req.auth_protocol_name, "MIT-MAGIC-COOKIE-1");
        assert_eq!(req.auth_protocol_data, vec![0xab; 16]);
    }

    #[test]
    fn test_success_response_shape() {
        let setup = Setup::from_config(&ServerConfig::default());
        let bytes = setup.encode_success(ByteOrder::LittleEndian, 0x0020_0000, 0x001f_ffff);
        assert_eq!(bytes[0], 1);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 11);
        let words = u16::from_le_bytes([bytes[6], bytes[7]]) as usize;
        assert_eq!(bytes.len(), 8 + words * 4);
        // resource id base sits at offset 12 of the additional data
        assert_eq!(
            u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            0x0020_0000
        );
    }

    #[test]
    fn test_failed_response_shape() {
        let bytes = Setup::encode_failed(ByteOrder::LittleEndian, "denied");
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1] as usize, "denied".len());
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn test_visual_lookup_and_writability() {
        let setup = Setup::from_config(&ServerConfig::default());
        assert!(!setup.visual(ROOT_VISUAL).unwrap().is_writable());
        assert!(setup.visual(PSEUDOCOLOR_VISUAL).unwrap().is_writable());
        assert!(setup.visual(0xdead).is_none());
    }
}
