/// Ticks in a whole note, matching the resolution of common web engravers.
pub const TICKS_PER_WHOLE: u32 = 16_384;

/// Converts a duration code (`w`, `h`, `q`, `8`, `16`, `32`, `64`, optionally dotted
/// with `d` or `.`, optionally suffixed with `r` for rests) into ticks.
pub fn duration_ticks(code: &str) -> Option<u32> {
    let code = code.trim().to_ascii_lowercase();
    let code = code.strip_suffix('r').unwrap_or(code.as_str());
    let base = code.trim_end_matches(|c: char| c == 'd' || c == '.');
    let dots = (code.len() - base.len()) as u32;

    let denominator = match base {
        "w" | "1" => 1,
        "h" | "2" => 2,
        "q" | "4" => 4,
        "8" => 8,
        "16" => 16,
        "32" => 32,
        "64" => 64,
        _ => return None,
    };
    let plain = TICKS_PER_WHOLE / denominator;

    let mut total = plain;
    let mut extra = plain;
    for _ in 0..dots {
        extra /= 2;
        if extra == 0 {
            return None;
        }
        total += extra;
    }
    Some(total)
}

/// Parses `n/d` into the length of one measure in ticks.
pub fn measure_ticks(signature: &str) -> Option<u32> {
    let (numerator, denominator) = signature.trim().split_once('/')?;
    let numerator: u32 = numerator.trim().parse().ok()?;
    let denominator: u32 = denominator.trim().parse().ok()?;
    if numerator == 0 || denominator == 0 || !denominator.is_power_of_two() || denominator > 64 {
        return None;
    }
    Some(numerator.checked_mul(TICKS_PER_WHOLE)? / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_durations() {
        assert_eq!(duration_ticks("w"), Some(16_384));
        assert_eq!(duration_ticks("h"), Some(8_192));
        assert_eq!(duration_ticks("q"), Some(4_096));
        assert_eq!(duration_ticks("8"), Some(2_048));
        assert_eq!(duration_ticks("64"), Some(256));
    }

    #[test]
    fn dotted_and_rest_durations() {
        assert_eq!(duration_ticks("qd"), Some(6_144));
        assert_eq!(duration_ticks("h."), Some(12_288));
        assert_eq!(duration_ticks("hdd"), Some(14_336));
        assert_eq!(duration_ticks("qr"), Some(4_096));
        assert_eq!(duration_ticks("8dr"), Some(3_072));
    }

    #[test]
    fn unknown_durations() {
        assert_eq!(duration_ticks("x"), None);
        assert_eq!(duration_ticks(""), None);
        assert_eq!(duration_ticks("3"), None);
    }

    #[test]
    fn measures() {
        assert_eq!(measure_ticks("4/4"), Some(16_384));
        assert_eq!(measure_ticks("3/4"), Some(12_288));
        assert_eq!(measure_ticks("6/8"), Some(12_288));
        assert_eq!(measure_ticks("3/5"), None);
        assert_eq!(measure_ticks("0/4"), None);
        assert_eq!(measure_ticks("common"), None);
        assert_eq!(measure_ticks("300000/4"), None);
        assert_eq!(measure_ticks("262143/4"), Some(262_143 * 4_096));
    }
}
