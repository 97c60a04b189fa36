//! Human-readable byte counts
//!
//! Binary units with a single letter suffix and exactly one decimal:
//! `0B`, `10.0B`, `1.5K`, `2.0M`, `1.0G`.

const UNITS: [char; 7] = ['B', 'K', 'M', 'G', 'T', 'P', 'E'];

/// Largest exponent (exbibytes)
const MAX_EXP: usize = UNITS.len() - 1;

/// Format a byte count as human-readable text
pub fn human_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }

    let exp = unit_exponent(bytes);
    let scaled = bytes as f64 / 1024f64.powi(exp as i32);
    format!("{:.1}{}", scaled, UNITS[exp])
}

/// floor(log1024(bytes)), clamped to the largest unit.
///
/// Computed with integer shifts so exact powers of 1024 never land one
/// unit short through floating point error.
fn unit_exponent(bytes: u64) -> usize {
    let mut exp = 0;
    let mut rest = bytes;
    while rest >= 1024 && exp < MAX_EXP {
        rest >>= 10;
        exp += 1;
    }
    exp
}
