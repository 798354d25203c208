use crate::error::FormatError;
use crate::quantizer::SharedBits;

/// The target block format of a compression call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BlockFormat {
    /// 8-byte 4-color interpolated block: 5:6:5 endpoints, 2-bit indices,
    /// with an alternative 3-entry + transparent codebook.
    Color,
    /// 8-byte 8-alpha interpolated block: 8-bit scalar endpoints, 3-bit
    /// indices, with an alternative 6-entry + 0/255 codebook.
    Alpha,
    /// 16-byte partitioned palette block.
    Palette(PaletteMode),
}

impl BlockFormat {
    /// Size in bytes of one compressed block.
    pub const fn block_len(self) -> usize {
        match self {
            BlockFormat::Color | BlockFormat::Alpha => 8,
            BlockFormat::Palette(_) => 16,
        }
    }

    /// Resolves a raw `(cb, ab, sb, ib)` endpoint layout against the support
    /// table.
    ///
    /// `cb`/`ab` are the stored color/alpha bits per channel including the
    /// shared bit, `sb` the number of shared low bits per endpoint, and `ib`
    /// the index bits. Layouts not in the table are rejected once, here,
    /// rather than per block.
    ///
    /// The 5:6:5 color family is matched first, by either of its channel
    /// widths; a palette mode with the same raw layout (mode 2 shares
    /// `(5, 0, 0, 2)`) is reached through [`PaletteMode::new`] instead.
    pub fn from_parameters(cb: u8, ab: u8, sb: u8, ib: u8) -> Result<Self, FormatError> {
        match (cb, ab, sb, ib) {
            (5, 0, 0, 2) | (6, 0, 0, 2) => return Ok(BlockFormat::Color),
            (0, 8, 0, 3) => return Ok(BlockFormat::Alpha),
            _ => {}
        }
        for mode in MODES.iter() {
            if mode.cb == cb && mode.ab == ab && mode.shared.bits() == sb && mode.ib == ib {
                return Ok(BlockFormat::Palette(PaletteMode(mode.mode)));
            }
        }
        Err(FormatError::InvalidParameters { cb, ab, sb, ib })
    }
}

/// One of the eight modes of the partitioned palette format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteMode(u8);

impl PaletteMode {
    /// All modes, in mode order.
    pub const ALL: [PaletteMode; 8] = [
        PaletteMode(0),
        PaletteMode(1),
        PaletteMode(2),
        PaletteMode(3),
        PaletteMode(4),
        PaletteMode(5),
        PaletteMode(6),
        PaletteMode(7),
    ];

    pub fn new(mode: u8) -> Result<Self, FormatError> {
        if mode < 8 {
            Ok(Self(mode))
        } else {
            Err(FormatError::UnknownMode(mode))
        }
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    pub(crate) fn descriptor(self) -> &'static ModeDescriptor {
        &MODES[self.0 as usize]
    }
}

/// Static description of one palette mode's bit layout.
///
/// `cb`/`ab` include the shared bit where the mode has one, matching how the
/// endpoints are held in stored domain throughout the encoder; the packer
/// splits the shared bit back out.
#[derive(Debug)]
pub(crate) struct ModeDescriptor {
    pub mode: u8,
    pub subsets: u8,
    pub partition_bits: u8,
    pub rotation_bits: u8,
    pub index_mode_bits: u8,
    /// Stored color bits per channel, including the shared bit.
    pub cb: u8,
    /// Stored alpha bits, including the shared bit. 0 means no stored alpha.
    pub ab: u8,
    pub shared: SharedBits,
    /// Index bits of the primary (color) index list.
    pub ib: u8,
    /// Index bits of the secondary (alpha) index list, 0 if the mode has a
    /// single list.
    pub ib2: u8,
}

impl ModeDescriptor {
    /// Number of partitions selectable by this mode.
    pub fn partitions(&self) -> u8 {
        if self.partition_bits == 0 {
            1
        } else {
            // modes with more table entries than partition bits can address
            // are clamped by the bit width
            let n = 1_u16 << self.partition_bits;
            n.min(64) as u8
        }
    }

    /// Whether the mode stores alpha endpoints.
    pub fn has_alpha(&self) -> bool {
        self.ab != 0
    }

    /// Whether the mode stores a separate alpha index list.
    pub fn has_alpha_indices(&self) -> bool {
        self.ib2 != 0
    }
}

pub(crate) const MODES: [ModeDescriptor; 8] = [
    ModeDescriptor {
        mode: 0,
        subsets: 3,
        partition_bits: 4,
        rotation_bits: 0,
        index_mode_bits: 0,
        cb: 5,
        ab: 0,
        shared: SharedBits::OnePerEndpoint,
        ib: 3,
        ib2: 0,
    },
    ModeDescriptor {
        mode: 1,
        subsets: 2,
        partition_bits: 6,
        rotation_bits: 0,
        index_mode_bits: 0,
        cb: 7,
        ab: 0,
        shared: SharedBits::OnePerSubset,
        ib: 3,
        ib2: 0,
    },
    ModeDescriptor {
        mode: 2,
        subsets: 3,
        partition_bits: 6,
        rotation_bits: 0,
        index_mode_bits: 0,
        cb: 5,
        ab: 0,
        shared: SharedBits::None,
        ib: 2,
        ib2: 0,
    },
    ModeDescriptor {
        mode: 3,
        subsets: 2,
        partition_bits: 6,
        rotation_bits: 0,
        index_mode_bits: 0,
        cb: 8,
        ab: 0,
        shared: SharedBits::OnePerEndpoint,
        ib: 2,
        ib2: 0,
    },
    ModeDescriptor {
        mode: 4,
        subsets: 1,
        partition_bits: 0,
        rotation_bits: 2,
        index_mode_bits: 1,
        cb: 5,
        ab: 6,
        shared: SharedBits::None,
        ib: 2,
        ib2: 3,
    },
    ModeDescriptor {
        mode: 5,
        subsets: 1,
        partition_bits: 0,
        rotation_bits: 2,
        index_mode_bits: 0,
        cb: 7,
        ab: 8,
        shared: SharedBits::None,
        ib: 2,
        ib2: 2,
    },
    ModeDescriptor {
        mode: 6,
        subsets: 1,
        partition_bits: 0,
        rotation_bits: 0,
        index_mode_bits: 0,
        cb: 8,
        ab: 8,
        shared: SharedBits::OnePerEndpoint,
        ib: 4,
        ib2: 0,
    },
    ModeDescriptor {
        mode: 7,
        subsets: 2,
        partition_bits: 6,
        rotation_bits: 0,
        index_mode_bits: 0,
        cb: 6,
        ab: 6,
        shared: SharedBits::OnePerEndpoint,
        ib: 2,
        ib2: 0,
    },
];
