//! Output boundary (spec.md §6 "External interfaces"): the fixed-layout
//! receiver hit log record and the sink traits the solver writes through.
//! No concrete sink (file, network) is implemented — only the interface
//! the core consumes, per spec.md §1's "specified only by the interfaces
//! the core consumes".

use crate::error::Result;
use crate::geometry::Float;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// One fixed-layout record per receiver visit (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct ReceiverHitRecord {
    pub realisation_id: u64,
    /// Always 0 in this version (spec.md §6).
    pub date: i64,
    /// Walker depth at which the hit occurred.
    pub segment_id: u32,
    /// `+instance_id` for FRONT, `-instance_id` for BACK.
    pub receiver_id: i32,
    pub wavelength: Float,
    pub pos: [Float; 3],
    pub in_dir: [Float; 3],
    pub normal: [Float; 3],
    pub weight: f64,
    pub uv: [Float; 2],
}

impl ReceiverHitRecord {
    /// Encodes the record in the exact field order and width spec.md §6
    /// lists, little-endian.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u64::<LittleEndian>(self.realisation_id)?;
        w.write_i64::<LittleEndian>(self.date)?;
        w.write_u32::<LittleEndian>(self.segment_id)?;
        w.write_i32::<LittleEndian>(self.receiver_id)?;
        w.write_f32::<LittleEndian>(self.wavelength)?;
        for v in self.pos {
            w.write_f32::<LittleEndian>(v)?;
        }
        for v in self.in_dir {
            w.write_f32::<LittleEndian>(v)?;
        }
        for v in self.normal {
            w.write_f32::<LittleEndian>(v)?;
        }
        w.write_f64::<LittleEndian>(self.weight)?;
        for v in self.uv {
            w.write_f32::<LittleEndian>(v)?;
        }
        Ok(())
    }
}

/// The solver writes every receiver hit log record through this trait
/// (spec.md §6). Implementations are responsible for their own durability;
/// the solver only guarantees that writes from distinct threads never
/// interleave partial records (it serialises calls behind a single mutex).
pub trait ReceiverSink: Send {
    fn write_record(&mut self, record: &ReceiverHitRecord) -> Result<()>;
}

/// A minimal tile callback shape for image output (spec.md §6 "Image
/// write"): the only supported pixel format is three `f64`s per pixel
/// (R, G, B). No pixel container, camera or rasteriser lives in this
/// crate — out of scope per spec.md §1.
pub trait TileSink: Send {
    fn write_tile(&mut self, origin: [u32; 2], size: [u32; 2], pixels: &[f64]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_encodes_to_the_documented_byte_width() {
        let record = ReceiverHitRecord {
            realisation_id: 1,
            date: 0,
            segment_id: 2,
            receiver_id: -3,
            wavelength: 0.55,
            pos: [1.0, 2.0, 3.0],
            in_dir: [0.0, 0.0, -1.0],
            normal: [0.0, 0.0, 1.0],
            weight: 123.456,
            uv: [0.25, 0.75],
        };
        let mut buf = Vec::new();
        record.write_to(&mut buf).unwrap();
        // 8+8+4+4+4 + 3*4 + 3*4 + 3*4 + 8 + 2*4 = 28 + 36 + 8 + 8 = 88 (with header 28)
        let expected = 8 + 8 + 4 + 4 + 4 + 12 + 12 + 12 + 8 + 8;
        assert_eq!(buf.len(), expected);
    }
}
