#[inline]
pub fn sat_add_i16(a: i16, b: i16) -> i16 {
    let s = a as i32 + b as i32;
    if s > i16::MAX as i32 {
        i16::MAX
    } else if s < i16::MIN as i32 {
        i16::MIN
    } else {
        s as i16
    }
}

/// Replicate the top bits of a 4-bit channel into a wider one.
#[inline]
pub fn widen_channel(c: u16, bits: u32) -> u32 {
    let c = (c & 0xF) as u32;
    match bits {
        5 => (c << 1) | (c >> 3),
        6 => (c << 2) | (c >> 2),
        8 => (c << 4) | c,
        _ => c,
    }
}

/// Split a 0BGR4444 colour into its (red, green, blue) nibbles.
#[inline]
pub fn split_0bgr4444(raw: u16) -> (u16, u16, u16) {
    (raw & 0xF, (raw >> 4) & 0xF, (raw >> 8) & 0xF)
}
