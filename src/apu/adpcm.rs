//! IMA-ADPCM step table
//!
//! The hardware derives its 128-entry step-size table from a geometric
//! recurrence (ratio roughly 1.1, realized as `x += x / 10` in integer
//! arithmetic) with a handful of fixed overrides. The table is rebuilt at
//! every APU reset and is read-only afterwards. Only entries 0-88 are
//! meaningful step sizes; the tail is zeroed so a decoder indexing past the
//! clamp range reads silence rather than garbage.

/// Number of entries in the step table
pub const ADPCM_TABLE_LEN: usize = 128;

/// Seed accumulator for the step recurrence; entry 0 is its high 16 bits
pub const ADPCM_SEED: u32 = 0x776D2;

/// Highest valid step table index for a conforming decoder
pub const ADPCM_INDEX_MAX: i32 = 88;

/// Build the IMA-ADPCM step table
///
/// Entry `a` is the high 16 bits of the running accumulator, except for the
/// fixed overrides at 3, 4 and 88 and the zeroed tail from 89 up. The
/// accumulator advances every iteration, overridden entries included; it
/// wraps around u32 inside the zeroed tail, which never reaches the output.
pub fn build_adpcm_table() -> [i32; ADPCM_TABLE_LEN] {
    let mut table = [0i32; ADPCM_TABLE_LEN];
    let mut x = ADPCM_SEED;

    for (a, entry) in table.iter_mut().enumerate() {
        *entry = match a {
            3 => 0xA,
            4 => 0xB,
            88 => 0x7FFF,
            _ if a >= 89 => 0,
            _ => (x >> 16) as i32,
        };
        x = x.wrapping_add(x / 10);
    }

    table
}
